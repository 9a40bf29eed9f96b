//! Lenient timestamp parsing for request bodies.
//!
//! Browsers and calendar widgets send dates in several shapes. Accepted:
//! - RFC 3339 with timezone: `2024-01-15T10:30:00Z`
//! - RFC 3339 with offset: `2024-01-15T10:30:00+02:00`
//! - ISO 8601 without timezone (assumes UTC): `2024-01-15T10:30:00`
//! - The same with fractional seconds: `2024-01-15T10:30:00.123`
//! - Date only (assumes midnight UTC): `2024-01-15`
//! - Space separated: `2024-01-15 10:30:00Z`
//!
//! Use the serde helpers with `#[serde(default, deserialize_with = ...)]`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer};

/// Parse a timestamp in any of the accepted shapes.
pub fn parse_flexible(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err(
            "Date value cannot be empty. Expected ISO 8601 format (e.g., '2024-01-15T10:30:00Z')"
                .to_string(),
        );
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(naive.and_utc());
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }

    // Some clients drop the seconds
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M") {
        return Ok(naive.and_utc());
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|n| n.and_utc())
            .ok_or_else(|| "Failed to create datetime from date".to_string());
    }

    let normalized = s.replace(' ', "T");
    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(dt.with_timezone(&Utc));
    }

    Err(format!(
        "Invalid date format: '{}'. Expected '2024-01-15T10:30:00Z' (with timezone), \
        '2024-01-15T10:30:00' (assumes UTC) or '2024-01-15' (date only, midnight UTC)",
        s
    ))
}

/// Deserialize a required timestamp.
pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_flexible(&s).map_err(de::Error::custom)
}

/// Deserialize an optional timestamp. `null` and `""` both map to `None`.
pub fn deserialize_option<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    match value {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => parse_flexible(&s).map(Some).map_err(de::Error::custom),
    }
}

/// Distinguish an absent field from an explicit `null` in PATCH bodies.
///
/// Absent → `None`, `null` → `Some(None)`, value → `Some(Some(v))`.
/// Requires `#[serde(default)]` on the field.
pub fn deserialize_nullable<'de, D, T>(
    deserializer: D,
) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// [`deserialize_nullable`] for timestamps. `null` and `""` both clear.
pub fn deserialize_nullable_datetime<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Option<DateTime<Utc>>>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_option(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_rfc3339_with_z() {
        let dt = parse_flexible("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(dt.year(), 2024);
        assert_eq!(dt.hour(), 10);
        assert_eq!(dt.minute(), 30);
    }

    #[test]
    fn test_rfc3339_with_offset() {
        let dt = parse_flexible("2024-01-15T10:30:00+02:00").unwrap();
        assert_eq!(dt.hour(), 8);
    }

    #[test]
    fn test_without_timezone() {
        let dt = parse_flexible("2026-01-15T17:00:00").unwrap();
        assert_eq!(dt.hour(), 17);
        assert_eq!(dt.day(), 15);
    }

    #[test]
    fn test_without_seconds() {
        let dt = parse_flexible("2026-01-15T17:45").unwrap();
        assert_eq!(dt.minute(), 45);
    }

    #[test]
    fn test_fractional_seconds() {
        let dt = parse_flexible("2024-01-15T10:30:00.250").unwrap();
        assert_eq!(dt.nanosecond(), 250_000_000);
    }

    #[test]
    fn test_date_only() {
        let dt = parse_flexible("2024-12-31").unwrap();
        assert_eq!(dt.month(), 12);
        assert_eq!(dt.day(), 31);
        assert_eq!(dt.hour(), 0);
    }

    #[test]
    fn test_space_separated() {
        let dt = parse_flexible("2024-01-15 10:30:00Z").unwrap();
        assert_eq!(dt.hour(), 10);
    }

    #[test]
    fn test_empty_string() {
        let err = parse_flexible("   ").unwrap_err();
        assert!(err.contains("cannot be empty"));
    }

    #[test]
    fn test_invalid_format() {
        let err = parse_flexible("next tuesday").unwrap_err();
        assert!(err.contains("Invalid date format"));
        assert!(err.contains("next tuesday"));
    }

    #[derive(Deserialize)]
    struct Body {
        #[serde(deserialize_with = "super::deserialize")]
        start: DateTime<Utc>,
        #[serde(default, deserialize_with = "super::deserialize_option")]
        due: Option<DateTime<Utc>>,
        #[serde(default, deserialize_with = "super::deserialize_nullable")]
        metadata: Option<Option<serde_json::Value>>,
        #[serde(default, deserialize_with = "super::deserialize_nullable_datetime")]
        end: Option<Option<DateTime<Utc>>>,
    }

    #[test]
    fn test_serde_helpers_absent_fields() {
        let body: Body = serde_json::from_str(r#"{"start":"2024-01-15"}"#).unwrap();
        assert_eq!(body.start.day(), 15);
        assert!(body.due.is_none());
        assert!(body.metadata.is_none());
        assert!(body.end.is_none());
    }

    #[test]
    fn test_serde_helpers_null_and_empty() {
        let body: Body =
            serde_json::from_str(r#"{"start":"2024-01-15","due":"","metadata":null}"#).unwrap();
        assert!(body.due.is_none());
        assert_eq!(body.metadata, Some(None));
    }

    #[test]
    fn test_nullable_datetime_clears() {
        let body: Body = serde_json::from_str(r#"{"start":"2024-01-15","end":null}"#).unwrap();
        assert_eq!(body.end, Some(None));

        let body: Body = serde_json::from_str(r#"{"start":"2024-01-15","end":""}"#).unwrap();
        assert_eq!(body.end, Some(None));

        let body: Body =
            serde_json::from_str(r#"{"start":"2024-01-15","end":"2024-01-16"}"#).unwrap();
        assert_eq!(body.end.flatten().map(|e| e.day()), Some(16));

        assert!(serde_json::from_str::<Body>(r#"{"start":"2024-01-15","end":"later"}"#).is_err());
    }

    #[test]
    fn test_serde_helpers_values() {
        let body: Body = serde_json::from_str(
            r#"{"start":"2024-01-15T09:00:00Z","due":"2024-02-01","metadata":{"a":1}}"#,
        )
        .unwrap();
        assert_eq!(body.due.unwrap().month(), 2);
        assert_eq!(body.metadata, Some(Some(serde_json::json!({"a": 1}))));
    }

    #[test]
    fn test_serde_helpers_reject_garbage() {
        let result = serde_json::from_str::<Body>(r#"{"start":"soon"}"#);
        assert!(result.is_err());
    }
}
