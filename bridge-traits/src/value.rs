//! Raw metadata values exchanged between the extraction ports and the core.
//!
//! A [`RawTree`] is the nested, unnormalized shape every metadata source
//! produces. Only the normalizer in `core-metadata` turns it into flat keys.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::collections::BTreeMap;

/// Nested mapping of raw metadata.
pub type RawTree = BTreeMap<String, RawValue>;

/// A single raw metadata value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Date(DateTime<FixedOffset>),
    Binary(Vec<u8>),
    Array(Vec<RawValue>),
    Map(RawTree),
    Provenance(Box<AppleProvenanceRecord>),
}

impl RawValue {
    pub fn text(value: impl Into<String>) -> Self {
        RawValue::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    pub fn as_map(&self) -> Option<&RawTree> {
        match self {
            RawValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// JSON rendering, used when a structured value has to collapse into text.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "null".to_string())
    }
}

impl From<serde_json::Value> for RawValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => RawValue::Null,
            Value::Bool(b) => RawValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => RawValue::Integer(i),
                None => RawValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => RawValue::Text(s),
            Value::Array(items) => RawValue::Array(items.into_iter().map(RawValue::from).collect()),
            Value::Object(map) => RawValue::Map(
                map.into_iter()
                    .map(|(key, value)| (key, RawValue::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Integer(value)
    }
}

impl From<u32> for RawValue {
    fn from(value: u32) -> Self {
        RawValue::Integer(i64::from(value))
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Bool(value)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(RawValue::Null)
    }
}

/// Download-origin record recovered from the `com.apple.provenance` extended
/// attribute.
///
/// `raw_data` is always populated with the base64 of the attribute bytes. On a
/// parse failure `error` is set and `parsed_data` stays empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AppleProvenanceRecord {
    #[serde(rename = "rawData")]
    pub raw_data: String,

    #[serde(rename = "parsedData", skip_serializing_if = "Option::is_none")]
    pub parsed_data: Option<RawTree>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(rename = "OriginatorName", skip_serializing_if = "Option::is_none")]
    pub originator_name: Option<String>,

    #[serde(rename = "OriginatorIdentifier", skip_serializing_if = "Option::is_none")]
    pub originator_identifier: Option<String>,

    #[serde(rename = "DownloadURL", skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,

    #[serde(rename = "DownloadDate", skip_serializing_if = "Option::is_none")]
    pub download_date: Option<String>,

    #[serde(rename = "QuarantineAgentName", skip_serializing_if = "Option::is_none")]
    pub quarantine_agent_name: Option<String>,

    #[serde(
        rename = "QuarantineAgentBundleIdentifier",
        skip_serializing_if = "Option::is_none"
    )]
    pub quarantine_agent_bundle_identifier: Option<String>,

    #[serde(rename = "QuarantineTimeStamp", skip_serializing_if = "Option::is_none")]
    pub quarantine_time_stamp: Option<String>,
}

impl AppleProvenanceRecord {
    /// Record for bytes that could not be parsed.
    pub fn failed(raw_data: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self {
            raw_data: raw_data.into(),
            error: Some(format!("Parsing failed: {}", reason)),
            ..Default::default()
        }
    }

    pub fn is_parsed(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_nests_objects() {
        let raw = RawValue::from(json!({
            "File": { "FileSize": 1024, "MIMEType": "image/png" },
            "EXIF": { "ExposureTime": 0.004, "Flash": null },
            "Keywords": ["a", "b"]
        }));

        let map = raw.as_map().unwrap();
        let file = map["File"].as_map().unwrap();
        assert_eq!(file["FileSize"], RawValue::Integer(1024));
        assert_eq!(file["MIMEType"], RawValue::text("image/png"));
        let exif = map["EXIF"].as_map().unwrap();
        assert_eq!(exif["ExposureTime"], RawValue::Float(0.004));
        assert!(exif["Flash"].is_null());
        assert_eq!(
            map["Keywords"],
            RawValue::Array(vec![RawValue::text("a"), RawValue::text("b")])
        );
    }

    #[test]
    fn test_option_into_raw_value() {
        let missing: Option<String> = None;
        assert_eq!(RawValue::from(missing), RawValue::Null);
        assert_eq!(RawValue::from(Some("x")), RawValue::text("x"));
    }

    #[test]
    fn test_failed_provenance_record_serializes_raw_data_and_error() {
        let record = AppleProvenanceRecord::failed("AAEC", "not a plist");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["rawData"], "AAEC");
        assert_eq!(json["error"], "Parsing failed: not a plist");
        assert!(json.get("parsedData").is_none());
        assert!(!record.is_parsed());
    }

    #[test]
    fn test_map_to_json_string() {
        let mut map = RawTree::new();
        map.insert("k".to_string(), RawValue::Integer(1));
        assert_eq!(RawValue::Map(map).to_json_string(), r#"{"k":1}"#);
    }
}
