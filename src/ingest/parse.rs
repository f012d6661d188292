//! Device payload parsing.
//!
//! The device body is `"field1: value1, field2: value2"`. Fields are
//! identified by position only: the first is the water level, the second
//! the distance to the nearest obstruction in centimetres. Names are never
//! checked, so firmware that renames a field keeps working and firmware
//! that reorders them is silently misread.

use chrono::{DateTime, Utc};

use crate::model::{MonitorError, TelemetrySample};

const FIELD_SEPARATOR: char = ',';
const NAME_VALUE_SEPARATOR: char = ':';
const EXPECTED_FIELDS: usize = 2;

/// Parses a raw device body into a `TelemetrySample` observed at
/// `observed_at`.
///
/// # Errors
/// `MonitorError::MalformedTelemetry` when:
/// - the body does not split into exactly two fields,
/// - a field has no `name: value` separator or an empty value,
/// - the distance is not an integer.
pub fn parse_telemetry(raw: &str, observed_at: DateTime<Utc>) -> Result<TelemetrySample, MonitorError> {
    let body = raw.trim();
    let fields: Vec<&str> = body.split(FIELD_SEPARATOR).collect();

    if fields.len() != EXPECTED_FIELDS {
        return Err(MonitorError::MalformedTelemetry(format!(
            "expected {} fields, got {} in {:?}",
            EXPECTED_FIELDS,
            fields.len(),
            body
        )));
    }

    let water_level = field_value(fields[0])?;
    let distance = field_value(fields[1])?;

    let distance_cm: i64 = distance.parse().map_err(|e| {
        MonitorError::MalformedTelemetry(format!("distance {:?} is not an integer: {}", distance, e))
    })?;

    Ok(TelemetrySample {
        water_level: water_level.to_string(),
        distance_cm,
        observed_at,
    })
}

/// Extracts the trimmed value portion of a `name: value` field.
fn field_value(field: &str) -> Result<&str, MonitorError> {
    let (_, value) = field.split_once(NAME_VALUE_SEPARATOR).ok_or_else(|| {
        MonitorError::MalformedTelemetry(format!("field {:?} has no name/value separator", field.trim()))
    })?;

    let value = value.trim();
    if value.is_empty() {
        return Err(MonitorError::MalformedTelemetry(format!(
            "field {:?} has an empty value",
            field.trim()
        )));
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::fixtures::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap()
    }

    // --- Valid payloads -----------------------------------------------------

    #[test]
    fn test_parse_normal_body() {
        let sample = parse_telemetry(NORMAL_BODY, fixed_now()).expect("normal body should parse");
        assert_eq!(sample.water_level, "50.00%");
        assert_eq!(sample.distance_cm, 30);
        assert_eq!(sample.observed_at, fixed_now());
    }

    #[test]
    fn test_parse_keeps_reading_text_verbatim() {
        let sample = parse_telemetry(OVERFLOW_BODY, fixed_now()).expect("overflow body should parse");
        assert_eq!(sample.water_level, "99.90%");
        assert_eq!(sample.distance_cm, 45);
    }

    #[test]
    fn test_parse_ignores_field_names_and_trailing_newline() {
        let sample = parse_telemetry(VERBOSE_NAMES_BODY, fixed_now()).expect("should parse");
        assert_eq!(sample.water_level, "73.25%");
        assert_eq!(sample.distance_cm, 112);
    }

    #[test]
    fn test_parse_trusts_position_not_names() {
        // Names swapped, values still mapped by position.
        let sample = parse_telemetry("distance: 80.00%, waterLevel: 7", fixed_now())
            .expect("should parse");
        assert_eq!(sample.water_level, "80.00%");
        assert_eq!(sample.distance_cm, 7);
    }

    #[test]
    fn test_parse_accepts_negative_distance() {
        let sample = parse_telemetry("waterLevel: 1.00%, distance: -1", fixed_now()).expect("should parse");
        assert_eq!(sample.distance_cm, -1);
    }

    // --- Malformed payloads -------------------------------------------------

    #[test]
    fn test_one_field_is_malformed() {
        let result = parse_telemetry(ONE_FIELD_BODY, fixed_now());
        assert!(
            matches!(result, Err(MonitorError::MalformedTelemetry(_))),
            "one field should be rejected, got {:?}",
            result
        );
    }

    #[test]
    fn test_three_fields_is_malformed() {
        let result = parse_telemetry(THREE_FIELD_BODY, fixed_now());
        assert!(matches!(result, Err(MonitorError::MalformedTelemetry(_))));
    }

    #[test]
    fn test_non_numeric_distance_is_malformed() {
        let result = parse_telemetry(NON_NUMERIC_DISTANCE_BODY, fixed_now());
        assert!(matches!(result, Err(MonitorError::MalformedTelemetry(_))));
    }

    #[test]
    fn test_fractional_distance_is_malformed() {
        let result = parse_telemetry("waterLevel: 50.00%, distance: 12.5", fixed_now());
        assert!(matches!(result, Err(MonitorError::MalformedTelemetry(_))));
    }

    #[test]
    fn test_empty_body_is_malformed() {
        let result = parse_telemetry("", fixed_now());
        assert!(matches!(result, Err(MonitorError::MalformedTelemetry(_))));
    }

    #[test]
    fn test_missing_separator_is_malformed() {
        let result = parse_telemetry("50.00%, 30", fixed_now());
        assert!(matches!(result, Err(MonitorError::MalformedTelemetry(_))));
    }

    #[test]
    fn test_empty_value_is_malformed() {
        let result = parse_telemetry("waterLevel: , distance: 30", fixed_now());
        assert!(matches!(result, Err(MonitorError::MalformedTelemetry(_))));
    }
}
