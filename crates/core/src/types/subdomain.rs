//! Tenant subdomain type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Subdomain`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SubdomainError {
    /// The input string is empty.
    #[error("subdomain cannot be empty")]
    Empty,
    /// The label is longer than a DNS label may be.
    #[error("subdomain must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The label contains a character outside `[a-z0-9-]`.
    #[error("subdomain contains invalid character {0:?}")]
    InvalidCharacter(char),
    /// The label starts or ends with a hyphen.
    #[error("subdomain cannot start or end with a hyphen")]
    HyphenAtEdge,
}

/// A merchant store subdomain, e.g. `shop1` in `shop1.kawn.com`.
///
/// Always a single lowercase DNS label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct Subdomain(String);

impl Subdomain {
    /// Maximum length of a DNS label.
    pub const MAX_LENGTH: usize = 63;

    /// Parse a `Subdomain`, lowercasing the input first.
    ///
    /// # Errors
    ///
    /// Returns a [`SubdomainError`] if the input is not a valid DNS label.
    pub fn parse(s: &str) -> Result<Self, SubdomainError> {
        let label = s.trim().to_ascii_lowercase();

        if label.is_empty() {
            return Err(SubdomainError::Empty);
        }
        if label.len() > Self::MAX_LENGTH {
            return Err(SubdomainError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if let Some(c) = label
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
        {
            return Err(SubdomainError::InvalidCharacter(c));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(SubdomainError::HyphenAtEdge);
        }

        Ok(Self(label))
    }

    /// Wrap a label known to be valid at compile time.
    pub(crate) fn new_unchecked(label: &str) -> Self {
        debug_assert!(Self::parse(label).is_ok());
        Self(label.to_owned())
    }

    /// Returns the subdomain as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Subdomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Subdomain {
    type Err = SubdomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Subdomain {
    type Error = SubdomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Subdomain> for String {
    fn from(subdomain: Subdomain) -> Self {
        subdomain.0
    }
}

impl AsRef<str> for Subdomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
