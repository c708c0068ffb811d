//! # Postal Codes and Countries
//!
//! Normalized postal code and country newtypes. Every cache key and every
//! provider request is built from these, so a malformed code is rejected at
//! construction and can never reach a cache or the network.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A 5-digit postal code.
///
/// Normalization keeps only ASCII digits and takes the first five, so
/// `"75201-1234"` and `" 75201 "` both become `75201`. Fewer than five
/// digits is an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PostalCode(String);

impl PostalCode {
    /// Normalize and validate a raw postal code.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).take(5).collect();
        if digits.len() < 5 {
            return Err(ValidationError::InvalidPostalCode(raw.to_string()));
        }
        Ok(Self(digits))
    }

    /// The normalized 5-digit code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PostalCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PostalCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PostalCode> for String {
    fn from(value: PostalCode) -> Self {
        value.0
    }
}

/// An uppercase ISO 3166-1 alpha-2 country code. Blank input means `US`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode(String);

impl CountryCode {
    /// Normalize and validate a raw country code.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::us());
        }
        if trimmed.len() != 2 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidCountryCode(raw.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// The United States.
    pub fn us() -> Self {
        Self("US".to_string())
    }

    /// Whether this is the United States.
    pub fn is_us(&self) -> bool {
        self.0 == "US"
    }

    /// The uppercase code.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The lowercase code, as some geocoders expect.
    pub fn to_lowercase(&self) -> String {
        self.0.to_ascii_lowercase()
    }
}

impl Default for CountryCode {
    fn default() -> Self {
        Self::us()
    }
}

impl std::fmt::Display for CountryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CountryCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CountryCode> for String {
    fn from(value: CountryCode) -> Self {
        value.0
    }
}

/// Find the first standalone 5-digit ZIP (optionally `ZIP+4`) in a free-form
/// address.
///
/// A match must not touch other word characters, so `"Suite 123456"` and
/// `"A12345"` yield nothing while `"Dallas, TX 75201-4412"` yields `75201`.
pub fn extract_postal_code(address: &str) -> Option<PostalCode> {
    let chars: Vec<char> = address.chars().collect();
    let is_word = |c: char| c.is_alphanumeric() || c == '_';

    let mut i = 0;
    while i < chars.len() {
        if !chars[i].is_ascii_digit() || (i > 0 && is_word(chars[i - 1])) {
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        let run = i - start;
        let bounded_after = i == chars.len() || !is_word(chars[i]);
        if run == 5 && bounded_after {
            let zip: String = chars[start..i].iter().collect();
            return PostalCode::parse(&zip).ok();
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postal_code_takes_first_five_digits() {
        assert_eq!(PostalCode::parse("75201-1234").unwrap().as_str(), "75201");
        assert_eq!(PostalCode::parse(" 07030 ").unwrap().as_str(), "07030");
        assert_eq!(PostalCode::parse("752011234").unwrap().as_str(), "75201");
    }

    #[test]
    fn postal_code_rejects_short_input() {
        assert!(PostalCode::parse("7520").is_err());
        assert!(PostalCode::parse("").is_err());
        assert!(PostalCode::parse("ABCDE").is_err());
    }

    #[test]
    fn postal_code_deserializes_with_normalization() {
        let zip: PostalCode = serde_json::from_str("\"90210-0001\"").unwrap();
        assert_eq!(zip.as_str(), "90210");
        assert!(serde_json::from_str::<PostalCode>("\"123\"").is_err());
    }

    #[test]
    fn country_defaults_to_us_and_uppercases() {
        assert_eq!(CountryCode::parse("").unwrap(), CountryCode::us());
        assert_eq!(CountryCode::parse("  ").unwrap().as_str(), "US");
        assert_eq!(CountryCode::parse("ca").unwrap().as_str(), "CA");
        assert!(!CountryCode::parse("mx").unwrap().is_us());
    }

    #[test]
    fn country_rejects_non_alpha2() {
        assert!(CountryCode::parse("USA").is_err());
        assert!(CountryCode::parse("1A").is_err());
    }

    #[test]
    fn extracts_zip_from_address() {
        let zip = extract_postal_code("1500 Marilla St, Dallas, TX 75201").unwrap();
        assert_eq!(zip.as_str(), "75201");
        let zip = extract_postal_code("Dock 4, Houston TX 77002-4412, USA").unwrap();
        assert_eq!(zip.as_str(), "77002");
    }

    #[test]
    fn skips_numbers_that_are_not_standalone_zips() {
        assert_eq!(extract_postal_code("Suite 123456, Springfield"), None);
        assert_eq!(extract_postal_code("Unit A12345"), None);
        assert_eq!(extract_postal_code("no zip here"), None);
        let zip = extract_postal_code("PO 123456, then 60601").unwrap();
        assert_eq!(zip.as_str(), "60601");
    }
}
