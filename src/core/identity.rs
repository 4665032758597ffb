//! Part identity: validated part numbers and `<number>-<description>` specs

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use thiserror::Error;

/// Minimum leading digits required of a part number unless a source relaxes it
pub const DEFAULT_MIN_DIGITS: usize = 6;

/// Relaxed bound used by report sources that carry five-digit legacy numbers
pub const RELAXED_MIN_DIGITS: usize = 5;

/// A validated, upper-cased part number
///
/// Part numbers start with a run of at least `min_digits` decimal digits and
/// may carry an alphanumeric suffix (e.g. `652149G03`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartNumber(String);

impl PartNumber {
    /// Parse and validate a part number
    pub fn parse(s: &str, min_digits: usize) -> Result<Self, PartNumberError> {
        let value = s.trim().to_uppercase();
        if value.is_empty() {
            return Err(PartNumberError::Empty);
        }

        if let Some(bad) = value.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(PartNumberError::InvalidCharacter {
                value: value.clone(),
                found: bad,
            });
        }

        let leading_digits = value.chars().take_while(|c| c.is_ascii_digit()).count();
        if leading_digits < min_digits {
            return Err(PartNumberError::TooFewDigits { value, min_digits });
        }

        Ok(Self(value))
    }

    /// Get the part number as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for PartNumber {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for PartNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for PartNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PartNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PartNumber::parse(&s, RELAXED_MIN_DIGITS).map_err(serde::de::Error::custom)
    }
}

/// A part reference of the form `<number>` or `<number>-<description>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartSpec {
    pub number: PartNumber,
    pub description: String,
}

impl PartSpec {
    /// Split on the first hyphen; everything after it is the description
    pub fn parse(spec: &str, min_digits: usize) -> Result<Self, PartNumberError> {
        let (number, description) = match spec.trim().split_once('-') {
            Some((number, description)) => (number, description.trim()),
            None => (spec.trim(), ""),
        };

        Ok(Self {
            number: PartNumber::parse(number, min_digits)?,
            description: description.to_string(),
        })
    }
}

/// Errors that can occur when validating part numbers
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum PartNumberError {
    #[error("empty part number")]
    #[diagnostic(code(whereused::part_number::empty))]
    Empty,

    #[error("invalid part number '{value}': needs at least {min_digits} leading digits")]
    #[diagnostic(
        code(whereused::part_number::too_short),
        help("set `min_part_digits` in .whereused/config.yaml if this source uses shorter numbers")
    )]
    TooFewDigits { value: String, min_digits: usize },

    #[error("invalid part number '{value}': unexpected character '{found}'")]
    #[diagnostic(code(whereused::part_number::character))]
    InvalidCharacter { value: String, found: char },
}
