//! Metadata Normalization
//!
//! Turns a nested [`RawTree`] into [`FlatMetadata`]: one level of
//! dot-joined keys with typed leaf values.
//!
//! ## Rules
//!
//! - Only maps are descended. Arrays and provenance records are leaves.
//! - Strings that read as dates become [`MetadataValue::Date`]; a bare
//!   number never does.
//! - A map nested inside an array collapses to its JSON text.
//! - File timestamp fields are rendered for display in local time.

use bridge_traits::{AppleProvenanceRecord, RawTree, RawValue};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::Serialize;
use std::collections::BTreeMap;

/// Joins the segments of a flattened key
pub const KEY_SEPARATOR: &str = ".";

/// Last key segments rendered with [`DISPLAY_DATE_FORMAT`]
pub const DISPLAY_DATE_FIELDS: [&str; 3] =
    ["FileModifyDate", "FileAccessDate", "FileInodeChangeDate"];

/// `1/2/2024, 3:04:05 PM`
pub const DISPLAY_DATE_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Offset-carrying formats tried after RFC 3339 and RFC 2822
const ZONED_FORMATS: [&str; 2] = ["%Y:%m:%d %H:%M:%S%:z", "%Y:%m:%d %H:%M:%S%.f%:z"];

/// Local-time formats
const NAIVE_FORMATS: [&str; 4] = [
    "%Y:%m:%d %H:%M:%S",
    "%Y:%m:%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// A normalized leaf value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Date(DateTime<FixedOffset>),
    Binary(Vec<u8>),
    Provenance(Box<AppleProvenanceRecord>),
    Array(Vec<MetadataValue>),
}

impl MetadataValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            MetadataValue::Date(date) => Some(date),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, MetadataValue::Null)
    }
}

/// Flat key → value mapping; ordered so output is deterministic.
pub type FlatMetadata = BTreeMap<String, MetadataValue>;

/// Flatten and coerce a raw tree.
pub fn normalize(tree: RawTree) -> FlatMetadata {
    let mut flat = BTreeMap::new();
    flatten_into(&mut flat, None, tree);

    flat.into_iter()
        .map(|(key, raw)| {
            let value = render_display_date(&key, coerce(raw));
            (key, value)
        })
        .collect()
}

/// Serialize flattened metadata for storage.
pub fn to_json(metadata: &FlatMetadata) -> serde_json::Value {
    serde_json::to_value(metadata).unwrap_or(serde_json::Value::Null)
}

fn flatten_into(out: &mut BTreeMap<String, RawValue>, prefix: Option<&str>, tree: RawTree) {
    for (key, value) in tree {
        let full_key = match prefix {
            Some(prefix) => format!("{}{}{}", prefix, KEY_SEPARATOR, key),
            None => key,
        };
        match value {
            RawValue::Map(inner) => flatten_into(out, Some(full_key.as_str()), inner),
            leaf => {
                out.insert(full_key, leaf);
            }
        }
    }
}

fn coerce(raw: RawValue) -> MetadataValue {
    match raw {
        RawValue::Null => MetadataValue::Null,
        RawValue::Bool(b) => MetadataValue::Bool(b),
        RawValue::Integer(i) => MetadataValue::Integer(i),
        RawValue::Float(f) => MetadataValue::Float(f),
        RawValue::Text(text) => match parse_date(&text) {
            Some(date) => MetadataValue::Date(date),
            None => MetadataValue::Text(text),
        },
        RawValue::Date(date) => MetadataValue::Date(date),
        RawValue::Binary(bytes) => MetadataValue::Binary(bytes),
        RawValue::Provenance(record) => MetadataValue::Provenance(record),
        RawValue::Array(items) => MetadataValue::Array(items.into_iter().map(coerce).collect()),
        map @ RawValue::Map(_) => MetadataValue::Text(map.to_json_string()),
    }
}

/// Recognise a date string.
///
/// Accepted: RFC 3339, RFC 2822, EXIF `YYYY:MM:DD HH:MM:SS[±HH:MM]`,
/// `YYYY-MM-DD HH:MM:SS` and `YYYY-MM-DD`. Forms without an offset are read
/// as local time.
pub fn parse_date(text: &str) -> Option<DateTime<FixedOffset>> {
    let text = text.trim();
    if text.len() < 8 || text.parse::<f64>().is_ok() {
        return None;
    }

    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date);
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(text) {
        return Some(date);
    }
    for format in ZONED_FORMATS {
        if let Ok(date) = DateTime::parse_from_str(text, format) {
            return Some(date);
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return local_to_fixed(naive);
        }
    }
    if let Ok(day) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return day.and_hms_opt(0, 0, 0).and_then(local_to_fixed);
    }

    None
}

fn local_to_fixed(naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|date| date.fixed_offset())
}

fn render_display_date(key: &str, value: MetadataValue) -> MetadataValue {
    let last_segment = key.rsplit(KEY_SEPARATOR).next().unwrap_or(key);
    if !DISPLAY_DATE_FIELDS.contains(&last_segment) {
        return value;
    }

    match value {
        MetadataValue::Date(date) => MetadataValue::Text(
            date.with_timezone(&Local)
                .format(DISPLAY_DATE_FORMAT)
                .to_string(),
        ),
        other => other,
    }
}
