//! LogEntry - the value flowing through the whole pipeline
//!
//! Wire form is a JSON object with PascalCase keys, one object per line on
//! the ingestion stream and one object per message on the live topic.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ContractError;

/// Prefix prepended to an application name to form its live topic
pub const LOG_TOPIC_PREFIX: &str = "pubsub:";

/// Live topic carrying real-time copies of an application's entries
pub fn log_topic(app_name: &str) -> String {
    format!("{LOG_TOPIC_PREFIX}{app_name}")
}

/// One application log record
///
/// No identity beyond field equality; duplicates are kept as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogEntry {
    /// Application that produced the line (routing key)
    #[serde(default)]
    pub app_name: String,

    /// Producing component (e.g. "app", "tsuru")
    #[serde(default)]
    pub source: String,

    /// Unit / instance identifier
    #[serde(default)]
    pub unit: String,

    /// Raw log message
    #[serde(default)]
    pub message: String,

    /// Time the line was emitted
    #[serde(default, alias = "Date", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Any additional fields sent by the producer
    #[serde(flatten, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl LogEntry {
    /// Build an entry with the routing fields set
    pub fn new(
        app_name: impl Into<String>,
        source: impl Into<String>,
        unit: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            app_name: app_name.into(),
            source: source.into(),
            unit: unit.into(),
            message: message.into(),
            timestamp: None,
            metadata: Map::new(),
        }
    }

    /// Attach a timestamp
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Decode one entry from its serialized form
    pub fn decode(data: &[u8]) -> Result<Self, ContractError> {
        Ok(serde_json::from_slice(data)?)
    }

    /// Encode into the compact form used on the live topic and on disk
    pub fn encode(&self) -> Result<Bytes, ContractError> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }
}

/// Live-tail filter
///
/// Each field matches when it is empty or equal to the entry's field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub unit: String,
}

impl LogFilter {
    pub fn new(source: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            unit: unit.into(),
        }
    }

    /// Whether `entry` passes both the source and the unit criteria
    pub fn matches(&self, entry: &LogEntry) -> bool {
        (self.source.is_empty() || self.source == entry.source)
            && (self.unit.is_empty() || self.unit == entry.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_decode_minimal_line() {
        let entry = LogEntry::decode(br#"{"AppName":"x","Message":"a"}"#).unwrap();
        assert_eq!(entry.app_name, "x");
        assert_eq!(entry.message, "a");
        assert!(entry.source.is_empty());
        assert!(entry.timestamp.is_none());
        assert!(entry.metadata.is_empty());
    }

    #[test]
    fn test_decode_accepts_date_alias_and_keeps_extra_fields() {
        let line = br#"{"AppName":"x","Date":"2015-06-01T10:00:00Z","MessageId":"m-1"}"#;
        let entry = LogEntry::decode(line).unwrap();
        assert_eq!(
            entry.timestamp,
            Some(Utc.with_ymd_and_hms(2015, 6, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(entry.metadata.get("MessageId"), Some(&Value::from("m-1")));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            LogEntry::decode(b"not-json"),
            Err(ContractError::Codec(_))
        ));
    }

    #[test]
    fn test_encoded_keys_are_pascal_case() {
        let entry = LogEntry::new("web", "app", "u1", "hello");
        let value: Value = serde_json::from_slice(&entry.encode().unwrap()).unwrap();
        assert_eq!(value["AppName"], "web");
        assert_eq!(value["Source"], "app");
        assert_eq!(value["Unit"], "u1");
        assert!(value.get("Timestamp").is_none());
    }

    #[test]
    fn test_filter_source_only_ignores_unit() {
        let filter = LogFilter::new("app", "");
        assert!(filter.matches(&LogEntry::new("web", "app", "u1", "m")));
        assert!(filter.matches(&LogEntry::new("web", "app", "u2", "m")));
        assert!(!filter.matches(&LogEntry::new("web", "tsuru", "u1", "m")));
    }

    #[test]
    fn test_filter_requires_both_fields() {
        let filter = LogFilter::new("app", "u1");
        assert!(filter.matches(&LogEntry::new("web", "app", "u1", "m")));
        assert!(!filter.matches(&LogEntry::new("web", "app", "u2", "m")));
        assert!(LogFilter::default().matches(&LogEntry::default()));
    }

    #[test]
    fn test_log_topic() {
        assert_eq!(log_topic("myapp"), "pubsub:myapp");
    }
}
