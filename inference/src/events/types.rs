//! Event record and lenient payload accessors.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Free-form event payload.
pub type EventPayload = serde_json::Map<String, serde_json::Value>;

/// A single behavioral event for a subject.
///
/// `timestamp` is `None` when the source omitted it or sent something that
/// does not parse. Consumers treat `None` as infinitely long ago.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payload: EventPayload,
}

impl Event {
    /// Create an event with an empty payload.
    pub fn new(event_type: impl Into<String>, timestamp: Option<DateTime<Utc>>) -> Self {
        Self {
            event_type: event_type.into(),
            timestamp,
            payload: EventPayload::new(),
        }
    }

    /// Attach a payload field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Shorthand for a `page_view` carrying `payload.url`.
    pub fn page_view(url: &str, timestamp: Option<DateTime<Utc>>) -> Self {
        Self::new("page_view", timestamp).with_field("url", url)
    }

    /// `payload.url` if it is a string.
    pub fn url(&self) -> Option<&str> {
        self.payload.get("url").and_then(|v| v.as_str())
    }

    /// `payload.duration` in seconds, only when numeric and strictly positive.
    ///
    /// Numeric strings are accepted; anything else is absent.
    pub fn duration_secs(&self) -> Option<f64> {
        let value = self.payload.get("duration")?;
        let secs = match value {
            serde_json::Value::Number(n) => n.as_f64()?,
            serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        (secs.is_finite() && secs > 0.0).then_some(secs)
    }
}

/// Accept RFC 3339 strings or epoch milliseconds; everything else becomes `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match value {
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        serde_json::Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rfc3339_timestamp() {
        let event: Event = serde_json::from_str(
            r#"{"type":"click","timestamp":"2024-05-01T10:00:00Z","payload":{"url":"/pricing"}}"#,
        )
        .unwrap();
        assert_eq!(event.event_type, "click");
        assert!(event.timestamp.is_some());
        assert_eq!(event.url(), Some("/pricing"));
    }

    #[test]
    fn test_epoch_millis_timestamp() {
        let event: Event =
            serde_json::from_str(r#"{"type":"scroll","timestamp":1714557600000}"#).unwrap();
        assert_eq!(
            event.timestamp,
            Utc.timestamp_millis_opt(1_714_557_600_000).single()
        );
        assert!(event.payload.is_empty());
    }

    #[test]
    fn test_malformed_timestamp_is_absent() {
        let event: Event =
            serde_json::from_str(r#"{"type":"click","timestamp":"yesterday-ish"}"#).unwrap();
        assert!(event.timestamp.is_none());

        let event: Event = serde_json::from_str(r#"{"type":"click","timestamp":[1,2]}"#).unwrap();
        assert!(event.timestamp.is_none());

        let event: Event = serde_json::from_str(r#"{"type":"click"}"#).unwrap();
        assert!(event.timestamp.is_none());
    }

    #[test]
    fn test_duration_only_positive_numbers() {
        let e = Event::new("page_view", None).with_field("duration", 42.5);
        assert_eq!(e.duration_secs(), Some(42.5));
        let e = Event::new("page_view", None).with_field("duration", "30");
        assert_eq!(e.duration_secs(), Some(30.0));
        let e = Event::new("page_view", None).with_field("duration", -3);
        assert_eq!(e.duration_secs(), None);
        let e = Event::new("page_view", None).with_field("duration", 0);
        assert_eq!(e.duration_secs(), None);
        let e = Event::new("page_view", None).with_field("duration", true);
        assert_eq!(e.duration_secs(), None);
    }

    #[test]
    fn test_non_string_url_is_absent() {
        let e = Event::new("page_view", None).with_field("url", 17);
        assert_eq!(e.url(), None);
    }
}
