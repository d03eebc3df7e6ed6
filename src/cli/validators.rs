//! CLI argument validators.
//!
//! Shared validation functions for CLI argument parsing.

use crate::constants::geo::{LATITUDE_RANGE, LONGITUDE_RANGE};
use chrono::{DateTime, Utc};
use std::ops::RangeInclusive;

/// Parse and validate a bounded float value.
///
/// # Arguments
///
/// * `s` - The string to parse
/// * `range` - Allowed values (inclusive)
/// * `name` - Name of the parameter for error messages
pub fn parse_bounded_float(s: &str, range: &RangeInclusive<f64>, name: &str) -> Result<f64, String> {
    let value: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !value.is_finite() || !range.contains(&value) {
        return Err(format!(
            "{name} must be between {} and {}, got {value}",
            range.start(),
            range.end()
        ));
    }

    Ok(value)
}

/// Parse and validate latitude value (-90.0 to 90.0).
pub fn parse_latitude(s: &str) -> Result<f64, String> {
    parse_bounded_float(s, &LATITUDE_RANGE, "latitude")
}

/// Parse and validate longitude value (-180.0 to 180.0).
pub fn parse_longitude(s: &str) -> Result<f64, String> {
    parse_bounded_float(s, &LONGITUDE_RANGE, "longitude")
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("'{s}' is not an RFC 3339 timestamp: {e}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_latitude_valid() {
        assert_eq!(parse_latitude("0.0").ok(), Some(0.0));
        assert_eq!(parse_latitude("90.0").ok(), Some(90.0));
        assert_eq!(parse_latitude("-90.0").ok(), Some(-90.0));
        assert_eq!(parse_latitude("40.7128").ok(), Some(40.7128));
    }

    #[test]
    fn test_parse_latitude_invalid() {
        assert!(parse_latitude("91.0").is_err());
        assert!(parse_latitude("-91.0").is_err());
        assert!(parse_latitude("abc").is_err());
        assert!(parse_latitude("NaN").is_err());
    }

    #[test]
    fn test_parse_longitude_valid() {
        assert_eq!(parse_longitude("180.0").ok(), Some(180.0));
        assert_eq!(parse_longitude("-74.0060").ok(), Some(-74.0060));
    }

    #[test]
    fn test_parse_longitude_invalid() {
        assert!(parse_longitude("181.0").is_err());
        assert!(parse_longitude("inf").is_err());
    }

    #[test]
    fn test_parse_bounded_float_message() {
        let err = parse_bounded_float("101.0", &(-100.0..=100.0), "test").unwrap_err();
        assert!(err.contains("test must be between"));
        let err = parse_bounded_float("abc", &(-100.0..=100.0), "test").unwrap_err();
        assert!(err.contains("not a valid number"));
    }

    #[test]
    fn test_parse_timestamp_normalizes_to_utc() {
        let t = parse_timestamp("2024-05-01T08:30:00+02:00").unwrap();
        assert_eq!(t.to_rfc3339(), "2024-05-01T06:30:00+00:00");
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("2024-05-01").is_err());
    }
}
