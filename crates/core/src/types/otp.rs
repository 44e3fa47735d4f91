//! Six-digit one-time codes (email OTP and TOTP).

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`OtpCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpCodeError {
    /// The code does not have exactly six characters.
    #[error("code must be exactly {expected} digits")]
    WrongLength {
        /// Required number of digits.
        expected: usize,
    },
    /// The code contains something other than ASCII digits.
    #[error("code must contain only digits")]
    NonDigit,
}

/// A six-digit verification code.
///
/// Used both for the email OTP sent at signup and for TOTP codes from an
/// authenticator app. Inner whitespace is stripped so `123 456` is accepted.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "String", into = "String")]
pub struct OtpCode(String);

impl OtpCode {
    /// Number of digits in a code.
    pub const LENGTH: usize = 6;

    /// Parse an `OtpCode`.
    ///
    /// # Errors
    ///
    /// Returns [`OtpCodeError`] unless the input is six ASCII digits.
    pub fn parse(s: &str) -> Result<Self, OtpCodeError> {
        let code: String = s.chars().filter(|c| !c.is_whitespace()).collect();

        if code.chars().any(|c| !c.is_ascii_digit()) {
            return Err(OtpCodeError::NonDigit);
        }
        if code.len() != Self::LENGTH {
            return Err(OtpCodeError::WrongLength {
                expected: Self::LENGTH,
            });
        }

        Ok(Self(code))
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Codes are short-lived credentials; keep them out of logs.
impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode(******)")
    }
}

impl TryFrom<String> for OtpCode {
    type Error = OtpCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OtpCode> for String {
    fn from(code: OtpCode) -> Self {
        code.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("123456")]
    #[case(" 123 456 ")]
    #[case("000000")]
    fn test_parse_valid(#[case] input: &str) {
        assert_eq!(OtpCode::parse(input).unwrap().as_str().len(), 6);
    }

    #[rstest]
    #[case("12345", OtpCodeError::WrongLength { expected: 6 })]
    #[case("1234567", OtpCodeError::WrongLength { expected: 6 })]
    #[case("", OtpCodeError::WrongLength { expected: 6 })]
    #[case("12a456", OtpCodeError::NonDigit)]
    fn test_parse_invalid(#[case] input: &str, #[case] expected: OtpCodeError) {
        assert_eq!(OtpCode::parse(input).unwrap_err(), expected);
    }

    #[test]
    fn test_debug_redacts() {
        let code = OtpCode::parse("987654").unwrap();
        assert!(!format!("{code:?}").contains("987654"));
    }
}
