//! IMO number validation
//!
//! An IMO number is seven digits; the last one is a check digit computed
//! from the first six weighted 7 down to 2.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from core domain parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("IMO number must be exactly 7 digits, got {0:?}")]
    ImoFormat(String),

    #[error("IMO number {imo} fails checksum (expected check digit {expected})")]
    ImoChecksum { imo: String, expected: u32 },
}

/// A validated IMO number
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Imo(String);

impl Imo {
    /// Parse and validate an IMO number (surrounding whitespace is ignored)
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.len() != 7 || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::ImoFormat(trimmed.to_string()));
        }

        let digits: Vec<u32> = trimmed.bytes().map(|b| (b - b'0') as u32).collect();
        let expected = check_digit(&digits[..6]);
        if expected != digits[6] {
            return Err(CoreError::ImoChecksum {
                imo: trimmed.to_string(),
                expected,
            });
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Weighted checksum over the first six digits
fn check_digit(prefix: &[u32]) -> u32 {
    prefix
        .iter()
        .enumerate()
        .map(|(i, d)| d * (7 - i as u32))
        .sum::<u32>()
        % 10
}

/// Check an identifier without keeping the parsed value
pub fn is_valid_imo(raw: &str) -> bool {
    Imo::parse(raw).is_ok()
}

impl FromStr for Imo {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Imo {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Imo> for String {
    fn from(imo: Imo) -> Self {
        imo.0
    }
}

impl fmt::Display for Imo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
