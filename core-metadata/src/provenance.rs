//! Provenance attribute parsing
//!
//! macOS stores download provenance as a binary property list inside the
//! `com.apple.provenance` extended attribute. The bytes are spilled to a
//! short-lived sibling file and parsed from there. Parsing never fails the
//! extraction: a bad payload yields a record carrying the raw bytes and the
//! reason.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bridge_traits::{AppleProvenanceRecord, RawTree, RawValue};
use chrono::{DateTime, SecondsFormat, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

/// Attribute name routed to [`parse_provenance`]
pub const PROVENANCE_ATTRIBUTE: &str = "com.apple.provenance";

/// Dictionary entries lifted onto the record
const KNOWN_FIELDS: [&str; 7] = [
    "OriginatorName",
    "OriginatorIdentifier",
    "DownloadURL",
    "DownloadDate",
    "QuarantineAgentName",
    "QuarantineAgentBundleIdentifier",
    "QuarantineTimeStamp",
];

/// Parse the raw bytes of `attr_name` read from `path`.
///
/// The temp file is named `.temp_<basename>_<attr>_<random>` next to `path`
/// and is removed when the parse finishes, whatever the outcome.
pub async fn parse_provenance(path: &Path, attr_name: &str, raw: Vec<u8>) -> AppleProvenanceRecord {
    let raw_data = STANDARD.encode(&raw);
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let base_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let prefix = format!(".temp_{}_{}_", base_name, attr_name.replace('/', "_"));

    let outcome =
        tokio::task::spawn_blocking(move || parse_via_temp_file(&dir, &prefix, &raw)).await;

    match outcome {
        Ok(Ok(value)) => match record_from_plist(raw_data.clone(), value) {
            Some(record) => {
                debug!(path = %path.display(), attr = attr_name, "Parsed provenance plist");
                record
            }
            None => failed(path, raw_data, "root object is not a dictionary"),
        },
        Ok(Err(reason)) => failed(path, raw_data, reason),
        Err(e) => failed(path, raw_data, e),
    }
}

fn failed(path: &Path, raw_data: String, reason: impl std::fmt::Display) -> AppleProvenanceRecord {
    warn!(path = %path.display(), reason = %reason, "Provenance attribute not parsed");
    AppleProvenanceRecord::failed(raw_data, reason)
}

fn parse_via_temp_file(
    dir: &Path,
    prefix: &str,
    raw: &[u8],
) -> std::result::Result<plist::Value, String> {
    let mut temp = tempfile::Builder::new()
        .prefix(prefix)
        .rand_bytes(8)
        .tempfile_in(dir)
        .map_err(|e| format!("cannot create temp file: {}", e))?;

    temp.write_all(raw)
        .and_then(|_| temp.flush())
        .map_err(|e| format!("cannot write temp file: {}", e))?;

    plist::Value::from_file(temp.path()).map_err(|e| e.to_string())
}

fn record_from_plist(raw_data: String, value: plist::Value) -> Option<AppleProvenanceRecord> {
    let plist::Value::Dictionary(dict) = value else {
        return None;
    };

    let field = |name: &str| dict.get(name).and_then(plist_field_text);

    let mut record = AppleProvenanceRecord {
        raw_data,
        originator_name: field(KNOWN_FIELDS[0]),
        originator_identifier: field(KNOWN_FIELDS[1]),
        download_url: field(KNOWN_FIELDS[2]),
        download_date: field(KNOWN_FIELDS[3]),
        quarantine_agent_name: field(KNOWN_FIELDS[4]),
        quarantine_agent_bundle_identifier: field(KNOWN_FIELDS[5]),
        quarantine_time_stamp: field(KNOWN_FIELDS[6]),
        ..Default::default()
    };

    let parsed: RawTree = dict
        .into_iter()
        .map(|(key, value)| (key, plist_to_raw(value)))
        .collect();
    record.parsed_data = Some(parsed);

    Some(record)
}

fn plist_date_to_utc(date: plist::Date) -> DateTime<Utc> {
    DateTime::<Utc>::from(SystemTime::from(date))
}

/// Text form of a known field; dates become RFC 3339.
fn plist_field_text(value: &plist::Value) -> Option<String> {
    match value {
        plist::Value::String(s) => Some(s.clone()),
        plist::Value::Date(d) => {
            Some(plist_date_to_utc(*d).to_rfc3339_opts(SecondsFormat::Secs, true))
        }
        plist::Value::Integer(i) => i
            .as_signed()
            .map(|v| v.to_string())
            .or_else(|| i.as_unsigned().map(|v| v.to_string())),
        plist::Value::Real(f) => Some(f.to_string()),
        plist::Value::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

fn plist_to_raw(value: plist::Value) -> RawValue {
    match value {
        plist::Value::Array(items) => RawValue::Array(items.into_iter().map(plist_to_raw).collect()),
        plist::Value::Dictionary(dict) => RawValue::Map(
            dict.into_iter()
                .map(|(key, value)| (key, plist_to_raw(value)))
                .collect(),
        ),
        plist::Value::Boolean(b) => RawValue::Bool(b),
        plist::Value::Data(bytes) => RawValue::Binary(bytes),
        plist::Value::Date(d) => RawValue::Date(plist_date_to_utc(d).fixed_offset()),
        plist::Value::Real(f) => RawValue::Float(f),
        plist::Value::Integer(i) => match i.as_signed() {
            Some(signed) => RawValue::Integer(signed),
            None => RawValue::Float(i.as_unsigned().map(|u| u as f64).unwrap_or(f64::NAN)),
        },
        plist::Value::String(s) => RawValue::Text(s),
        plist::Value::Uid(uid) => RawValue::Integer(uid.get() as i64),
        _ => RawValue::Null,
    }
}
