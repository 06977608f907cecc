use chrono::Utc;
use serde::Deserialize;

use crate::error::DecodeError;
use crate::models::Reading;

#[derive(Deserialize)]
struct WirePayload {
    value: Option<serde_json::Value>,
}

/// Decode one bus message into a [`Reading`].
///
/// The sensor kind is the trailing segment of the topic (`sensors/energy`
/// -> `energy`); the payload is a JSON object with a numeric `value`
/// field. `observed_at` is stamped here, at receipt.
pub fn decode(topic: &str, payload: &[u8]) -> Result<Reading, DecodeError> {
    let sensor_kind = topic.rsplit('/').next().unwrap_or_default();
    if sensor_kind.is_empty() {
        return Err(DecodeError::EmptyKind(topic.to_string()));
    }

    let wire: WirePayload = serde_json::from_slice(payload)?;
    let value = wire
        .value
        .as_ref()
        .and_then(serde_json::Value::as_f64)
        .ok_or(DecodeError::MissingValue)?;

    Ok(Reading {
        sensor_kind: sensor_kind.to_string(),
        value,
        observed_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_valid_payload() {
        let reading = decode("sensors/energy", br#"{"value": 3.5}"#).unwrap();
        assert_eq!(reading.sensor_kind, "energy");
        assert_eq!(reading.value, 3.5);
    }

    #[test]
    fn kind_is_last_topic_segment() {
        let reading = decode("home/sensors/humidity", br#"{"value": 61.2}"#).unwrap();
        assert_eq!(reading.sensor_kind, "humidity");
    }

    #[test]
    fn bare_topic_is_its_own_kind() {
        let reading = decode("temperature", br#"{"value": 19.0}"#).unwrap();
        assert_eq!(reading.sensor_kind, "temperature");
    }

    #[test]
    fn rejects_malformed_json() {
        let err = decode("sensors/energy", b"not json").unwrap_err();
        assert!(matches!(err, DecodeError::MalformedPayload(_)));
    }

    #[test]
    fn rejects_missing_value() {
        let err = decode("sensors/energy", br#"{"reading": 1.0}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MissingValue));
    }

    #[test]
    fn rejects_non_numeric_value() {
        let err = decode("sensors/energy", br#"{"value": "high"}"#).unwrap_err();
        assert!(matches!(err, DecodeError::MissingValue));
    }

    #[test]
    fn rejects_trailing_slash_topic() {
        let err = decode("sensors/", br#"{"value": 1.0}"#).unwrap_err();
        assert!(matches!(err, DecodeError::EmptyKind(_)));
    }

    #[test]
    fn accepts_integer_value() {
        let reading = decode("sensors/energy", br#"{"value": 2}"#).unwrap();
        assert_eq!(reading.value, 2.0);
    }
}
