//! PDF document properties
//!
//! Only the document information dictionary is consulted. The result always
//! holds the same seven keys; a property the document does not set is null.

use bridge_traits::{RawTree, RawValue};
use chrono::{FixedOffset, NaiveDate, SecondsFormat, TimeZone};
use lopdf::{Document, Object};

use crate::error::{MetadataError, Result};

/// Output key and the info-dictionary entry it comes from
const PDF_PROPERTIES: [(&str, &[u8]); 7] = [
    ("title", b"Title"),
    ("author", b"Author"),
    ("subject", b"Subject"),
    ("keywords", b"Keywords"),
    ("producer", b"Producer"),
    ("creationDate", b"CreationDate"),
    ("modificationDate", b"ModDate"),
];

/// Read the fixed property set from an in-memory PDF.
pub fn read_pdf_properties(bytes: &[u8]) -> Result<RawTree> {
    let doc = Document::load_mem(bytes).map_err(|e| MetadataError::Pdf(e.to_string()))?;

    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| match obj {
            Object::Reference(id) => doc.get_object(*id).ok(),
            other => Some(other),
        })
        .and_then(|obj| obj.as_dict().ok());

    let mut properties = RawTree::new();
    for (key, entry) in PDF_PROPERTIES {
        let value = info
            .and_then(|dict| dict.get(entry).ok())
            .and_then(object_text)
            .filter(|text| !text.is_empty())
            .map(|text| {
                if key.ends_with("Date") {
                    parse_pdf_date(&text).unwrap_or(text)
                } else {
                    text
                }
            });
        properties.insert(key.to_string(), value.into());
    }

    Ok(properties)
}

fn object_text(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

/// UTF-16BE when the BOM is present, otherwise byte-per-char.
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Convert `D:YYYYMMDDHHmmSSOHH'mm'` to RFC 3339. Every part after the year
/// is optional; a missing offset means UTC.
pub fn parse_pdf_date(raw: &str) -> Option<String> {
    let s = raw.trim();
    let s = s.strip_prefix("D:").unwrap_or(s);
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return None;
    }

    let part = |range: std::ops::Range<usize>, default: u32| -> Option<u32> {
        match digits.get(range) {
            Some(text) => text.parse().ok(),
            None => Some(default),
        }
    };
    let year: i32 = digits.get(0..4)?.parse().ok()?;
    let month = part(4..6, 1)?;
    let day = part(6..8, 1)?;
    let hour = part(8..10, 0)?;
    let minute = part(10..12, 0)?;
    let second = part(12..14, 0)?;

    let offset = parse_offset(&s[digits.len()..])?;
    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;
    let date = offset.from_local_datetime(&naive).single()?;

    Some(date.to_rfc3339_opts(SecondsFormat::Secs, false))
}

fn parse_offset(rest: &str) -> Option<FixedOffset> {
    let mut chars = rest.chars();
    let sign = match chars.next() {
        None | Some('Z') => return FixedOffset::east_opt(0),
        Some('+') => 1,
        Some('-') => -1,
        Some(_) => return None,
    };

    let numbers: Vec<i32> = chars
        .as_str()
        .split('\'')
        .filter(|part| !part.is_empty())
        .map(|part| part.parse().ok())
        .collect::<Option<Vec<_>>>()?;
    let hours = numbers.first().copied().unwrap_or(0);
    let minutes = numbers.get(1).copied().unwrap_or(0);

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
