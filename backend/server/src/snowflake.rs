//! # Snowflakes
//!
//! A Discord id is a 64-bit integer whose top 42 bits are milliseconds since
//! the Discord epoch (2015-01-01T00:00:00Z). The low 22 bits hold worker,
//! process and sequence numbers and are discarded.
//!
//! Ids exceed 2^53, so they are parsed straight into `u64`. Going through
//! `f64` would silently corrupt the low bits.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::id::UserId;

pub const DISCORD_EPOCH_MS: u64 = 1_420_070_400_000;
pub const TIMESTAMP_SHIFT: u32 = 22;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SnowflakeError {
    #[error("snowflake is not an unsigned integer: {0:?}")]
    NotNumeric(String),

    #[error("snowflake timestamp out of range: {0}")]
    OutOfRange(u64),
}

pub fn decode(raw: &str) -> Result<DateTime<Utc>, SnowflakeError> {
    let value = raw
        .parse::<u64>()
        .map_err(|_| SnowflakeError::NotNumeric(raw.to_string()))?;

    decode_value(value)
}

pub fn decode_value(value: u64) -> Result<DateTime<Utc>, SnowflakeError> {
    let millis = (value >> TIMESTAMP_SHIFT) + DISCORD_EPOCH_MS;

    i64::try_from(millis)
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or(SnowflakeError::OutOfRange(millis))
}

/// Any `u64` shifted by 22 bits lands well inside chrono's range.
pub fn decode_id(id: &UserId) -> DateTime<Utc> {
    decode_value(id.value()).unwrap_or(DateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_known_id() {
        // 175928847299117063 is the id used in Discord's own snowflake docs
        let created = decode("175928847299117063").unwrap();
        assert_eq!(created.timestamp_millis(), 1_462_015_105_796);
    }

    #[test]
    fn test_epoch_floor() {
        assert_eq!(
            decode("0").unwrap(),
            Utc.timestamp_millis_opt(DISCORD_EPOCH_MS as i64).unwrap()
        );
    }

    #[test]
    fn test_low_bits_ignored() {
        let base = 175_928_847_299_117_063u64 & !((1 << TIMESTAMP_SHIFT) - 1);
        assert_eq!(decode_value(base).unwrap(), decode_value(base | 0x3F_FFFF).unwrap());
    }

    #[test]
    fn test_precision_beyond_f64() {
        let a = decode("1234567890123456789").unwrap();
        let b = decode_value(1_234_567_890_123_456_789).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.timestamp_millis() as u64, (1_234_567_890_123_456_789u64 >> 22) + DISCORD_EPOCH_MS);
    }

    #[test]
    fn test_realistic_ids_are_between_epoch_and_now() {
        let epoch = Utc.timestamp_millis_opt(DISCORD_EPOCH_MS as i64).unwrap();
        let now = Utc::now();

        for raw in ["80351110224678912", "123456789012345678", "175928847299117063", "1100000000000000000"] {
            let created = decode(raw).unwrap();
            assert!(created > epoch, "{raw} decoded to {created}");
            assert!(created < now, "{raw} decoded to {created}");
        }
    }

    #[test]
    fn test_deterministic() {
        let id = UserId::parse("123456789012345678").unwrap();
        assert_eq!(decode_id(&id), decode_id(&id));
        assert_eq!(decode_id(&id), decode("123456789012345678").unwrap());
    }

    #[test]
    fn test_rejects_non_numeric() {
        assert!(matches!(decode("12ab"), Err(SnowflakeError::NotNumeric(_))));
        assert!(matches!(decode("-5"), Err(SnowflakeError::NotNumeric(_))));
    }
}
