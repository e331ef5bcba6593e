use std::{fmt, ops::Range};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::AppError;

// `\d` is Unicode-aware in `regex`, ASCII digits only here
static ID_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{17,19}$").unwrap());

pub fn is_valid_id(raw: &str) -> bool {
    ID_PATTERN.is_match(raw)
}

/// A Discord snowflake that passed validation.
///
/// Keeps both the original digits (digit-indexed mock derivation works on the
/// string) and the integer value (timestamp decoding works on the bits).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId {
    raw: String,
    value: u64,
}

impl UserId {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        if !is_valid_id(raw) {
            return Err(AppError::InvalidId);
        }

        // 19 digits always fit in a u64
        let value = raw.parse::<u64>().map_err(|_| AppError::InvalidId)?;

        Ok(Self {
            raw: raw.to_string(),
            value,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn digit(&self, index: usize) -> u32 {
        self.raw.as_bytes()[index] as u32 - b'0' as u32
    }

    pub fn last_digit(&self) -> u32 {
        self.digit(self.raw.len() - 1)
    }

    /// The digits in `range` read as one decimal number.
    pub fn digits(&self, range: Range<usize>) -> u32 {
        self.raw[range]
            .bytes()
            .fold(0, |acc, b| acc * 10 + (b - b'0') as u32)
    }

    pub fn last4(&self) -> &str {
        &self.raw[self.raw.len() - 4..]
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
