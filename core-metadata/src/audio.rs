//! Audio Tag Extraction
//!
//! Reads container properties and tags with `lofty` and merges them into one
//! `audio` object:
//!
//! - `format`: file type, duration, bitrate, sample rate, channels, bit depth
//! - `common`: well-known fields from the primary (or first) tag plus any
//!   other text items it carries
//! - `id3`: an independent read of the ID3v2 tag, or ID3v1 when that is all
//!   the file has
//!
//! Reading is blocking; callers run [`read_audio`] on a blocking thread.

use bridge_traits::{RawTree, RawValue};
use lofty::file::{AudioFile, TaggedFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, ItemValue, Tag, TagType};
use std::path::Path;
use tracing::debug;

use crate::error::{MetadataError, Result};

/// Read the merged audio object of `path`.
pub fn read_audio(path: &Path) -> Result<RawTree> {
    let tagged_file = Probe::open(path)
        .map_err(|e| MetadataError::Audio(format!("Failed to open file: {}", e)))?
        .guess_file_type()
        .map_err(|e| MetadataError::Audio(format!("Failed to probe file: {}", e)))?
        .read()
        .map_err(|e| MetadataError::Audio(format!("Failed to parse file: {}", e)))?;

    let mut audio = RawTree::new();
    audio.insert("format".to_string(), RawValue::Map(format_section(&tagged_file)));

    let common = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())
        .map(common_section)
        .unwrap_or_default();
    audio.insert("common".to_string(), RawValue::Map(common));

    let id3 = tagged_file
        .tag(TagType::Id3v2)
        .or_else(|| tagged_file.tag(TagType::Id3v1))
        .map(id3_section)
        .map(RawValue::Map)
        .unwrap_or(RawValue::Null);
    audio.insert("id3".to_string(), id3);

    debug!(
        path = %path.display(),
        file_type = ?tagged_file.file_type(),
        tags = tagged_file.tags().len(),
        "Read audio tags"
    );

    Ok(audio)
}

fn format_section(tagged_file: &TaggedFile) -> RawTree {
    let properties = tagged_file.properties();
    let mut format = RawTree::new();

    format.insert(
        "container".to_string(),
        RawValue::text(format!("{:?}", tagged_file.file_type())),
    );
    format.insert(
        "duration".to_string(),
        RawValue::Integer(properties.duration().as_millis() as i64),
    );
    format.insert("bitrate".to_string(), properties.audio_bitrate().into());
    format.insert(
        "overallBitrate".to_string(),
        properties.overall_bitrate().into(),
    );
    format.insert("sampleRate".to_string(), properties.sample_rate().into());
    format.insert(
        "numberOfChannels".to_string(),
        properties.channels().map(u32::from).into(),
    );
    format.insert(
        "bitsPerSample".to_string(),
        properties.bit_depth().map(u32::from).into(),
    );

    format
}

fn common_section(tag: &Tag) -> RawTree {
    let mut common = RawTree::new();
    let mut put = |key: &str, value: Option<RawValue>| {
        if let Some(value) = value {
            common.insert(key.to_string(), value);
        }
    };

    put("title", tag.title().map(|s| normalize_text(&s).into()));
    put("artist", tag.artist().map(|s| normalize_text(&s).into()));
    put("album", tag.album().map(|s| normalize_text(&s).into()));
    put(
        "albumartist",
        tag.get_string(&ItemKey::AlbumArtist)
            .map(|s| normalize_text(s).into()),
    );
    put("year", tag.year().map(RawValue::from));
    put("genre", tag.genre().map(|s| normalize_text(&s).into()));
    put(
        "composer",
        tag.get_string(&ItemKey::Composer)
            .map(|s| normalize_text(s).into()),
    );
    put("comment", tag.comment().map(|s| normalize_text(&s).into()));
    put("track", Some(number_pair(tag.track(), tag.track_total())));
    put("disk", Some(number_pair(tag.disk(), tag.disk_total())));

    // Remaining text items not covered above
    for item in tag.items() {
        if is_common_field(item.key()) {
            continue;
        }
        let lower = lower_camel(&item_key_name(item.key()));
        if common.contains_key(&lower) {
            continue;
        }
        if let ItemValue::Text(text) = item.value() {
            common.insert(lower, RawValue::text(normalize_text(text)));
        }
    }

    common
}

/// Keys already read through the accessors in [`common_section`]
fn is_common_field(key: &ItemKey) -> bool {
    matches!(
        key,
        ItemKey::TrackTitle
            | ItemKey::TrackArtist
            | ItemKey::AlbumTitle
            | ItemKey::AlbumArtist
            | ItemKey::Composer
            | ItemKey::Genre
            | ItemKey::Comment
            | ItemKey::Year
            | ItemKey::RecordingDate
            | ItemKey::TrackNumber
            | ItemKey::TrackTotal
            | ItemKey::DiscNumber
            | ItemKey::DiscTotal
    )
}

fn id3_section(tag: &Tag) -> RawTree {
    let mut id3 = RawTree::new();
    id3.insert(
        "version".to_string(),
        RawValue::text(format!("{:?}", tag.tag_type())),
    );

    for item in tag.items() {
        let value = match item.value() {
            ItemValue::Text(text) | ItemValue::Locator(text) => RawValue::text(text.clone()),
            ItemValue::Binary(bytes) => RawValue::Binary(bytes.clone()),
        };
        id3.insert(item_key_name(item.key()), value);
    }

    let pictures = tag.pictures();
    if !pictures.is_empty() {
        id3.insert(
            "pictureCount".to_string(),
            RawValue::Integer(pictures.len() as i64),
        );
    }

    id3
}

/// `{no, of}` pair as the tag reader reports it
fn number_pair(no: Option<u32>, of: Option<u32>) -> RawValue {
    let mut pair = RawTree::new();
    pair.insert("no".to_string(), no.into());
    pair.insert("of".to_string(), of.into());
    RawValue::Map(pair)
}

fn item_key_name(key: &ItemKey) -> String {
    match key {
        ItemKey::Unknown(name) => name.clone(),
        other => format!("{:?}", other),
    }
}

fn lower_camel(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Collapse whitespace runs and drop control characters
fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .filter(|c| !c.is_control())
        .collect()
}
