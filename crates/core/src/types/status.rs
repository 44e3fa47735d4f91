//! Store-level enums shared by the storefront and the merchant dashboard.

use serde::{Deserialize, Serialize};

/// What a merchant sells. Drives the default copy of virtual pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    /// Physical goods with shipping.
    #[default]
    General,
    /// Digital goods delivered instantly (gift cards, codes, downloads).
    Digital,
}

impl StoreType {
    /// Lenient parse used for backend values such as `"digital_cards"`.
    #[must_use]
    pub fn from_backend(value: &str) -> Self {
        if value.trim().to_ascii_lowercase().starts_with("digital") {
            Self::Digital
        } else {
            Self::General
        }
    }
}

/// Storefront display language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Arabic (right-to-left).
    #[default]
    Ar,
    /// English.
    En,
}

impl Language {
    /// Pick a language from a code like `en`, `en-US` or `ar-SA`.
    ///
    /// Anything that is not English falls back to Arabic, the platform default.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        if code.trim().to_ascii_lowercase().starts_with("en") {
            Self::En
        } else {
            Self::Ar
        }
    }

    /// Two-letter language code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Ar => "ar",
            Self::En => "en",
        }
    }

    /// Whether text in this language is laid out right-to-left.
    #[must_use]
    pub const fn is_rtl(self) -> bool {
        matches!(self, Self::Ar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("digital", StoreType::Digital)]
    #[case("Digital_Cards", StoreType::Digital)]
    #[case("general", StoreType::General)]
    #[case("", StoreType::General)]
    fn test_store_type_from_backend(#[case] input: &str, #[case] expected: StoreType) {
        assert_eq!(StoreType::from_backend(input), expected);
    }

    #[rstest]
    #[case("en", Language::En)]
    #[case("en-US", Language::En)]
    #[case("ar-SA", Language::Ar)]
    #[case("fr", Language::Ar)]
    fn test_language_from_code(#[case] input: &str, #[case] expected: Language) {
        assert_eq!(Language::from_code(input), expected);
    }

    #[test]
    fn test_language_rtl() {
        assert!(Language::Ar.is_rtl());
        assert!(!Language::En.is_rtl());
        assert_eq!(Language::En.code(), "en");
    }
}
