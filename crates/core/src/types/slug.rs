//! URL slugs for pages and categories.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Slug`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// The input string is empty.
    #[error("slug cannot be empty")]
    Empty,
    /// The slug contains characters outside the allowed set.
    #[error("slug may only contain lowercase letters, digits and single hyphens")]
    InvalidFormat,
}

/// A URL-safe slug such as `about` or `summer-sale`.
///
/// Letters may be any lowercase Unicode letter so Arabic slugs are valid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Parse a `Slug` exactly as given (no normalization besides trimming).
    ///
    /// # Errors
    ///
    /// Returns [`SlugError`] if the slug is empty, has uppercase letters,
    /// leading/trailing/double hyphens, or other punctuation.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        let slug = s.trim();
        if slug.is_empty() {
            return Err(SlugError::Empty);
        }
        let valid_chars = slug
            .chars()
            .all(|c| c == '-' || (c.is_alphanumeric() && !c.is_uppercase()));
        if !valid_chars || slug.starts_with('-') || slug.ends_with('-') || slug.contains("--") {
            return Err(SlugError::InvalidFormat);
        }
        Ok(Self(slug.to_owned()))
    }

    /// Derive a slug from free text, e.g. a category name.
    ///
    /// Returns `None` when the text has no letters or digits at all.
    ///
    /// ```
    /// use kawn_core::Slug;
    ///
    /// assert_eq!(Slug::slugify("Summer Sale 2024!").unwrap().as_str(), "summer-sale-2024");
    /// assert!(Slug::slugify("!!!").is_none());
    /// ```
    #[must_use]
    pub fn slugify(text: &str) -> Option<Self> {
        let mut out = String::with_capacity(text.len());
        let mut pending_hyphen = false;
        for c in text.trim().chars() {
            if c.is_alphanumeric() {
                if pending_hyphen && !out.is_empty() {
                    out.push('-');
                }
                pending_hyphen = false;
                out.extend(c.to_lowercase());
            } else {
                pending_hyphen = true;
            }
        }
        if out.is_empty() { None } else { Some(Self(out)) }
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("about")]
    #[case("privacy-policy")]
    #[case("sale-2024")]
    #[case("عروض")]
    fn test_parse_valid(#[case] input: &str) {
        assert_eq!(Slug::parse(input).unwrap().as_str(), input);
    }

    #[rstest]
    #[case("", SlugError::Empty)]
    #[case("About", SlugError::InvalidFormat)]
    #[case("-about", SlugError::InvalidFormat)]
    #[case("about-", SlugError::InvalidFormat)]
    #[case("a--b", SlugError::InvalidFormat)]
    #[case("a b", SlugError::InvalidFormat)]
    #[case("a/b", SlugError::InvalidFormat)]
    fn test_parse_invalid(#[case] input: &str, #[case] expected: SlugError) {
        assert_eq!(Slug::parse(input).unwrap_err(), expected);
    }

    #[rstest]
    #[case("Home & Garden", "home-garden")]
    #[case("  Phones  ", "phones")]
    #[case("إلكترونيات منزلية", "إلكترونيات-منزلية")]
    fn test_slugify(#[case] input: &str, #[case] expected: &str) {
        let slug = Slug::slugify(input).unwrap();
        assert_eq!(slug.as_str(), expected);
        assert!(Slug::parse(slug.as_str()).is_ok());
    }
}
