//! Text-location resolution and child enumeration over item metadata.
//!
//! All functions here are pure over the item JSON document; fetching and
//! retries live elsewhere.

use serde_json::Value;

use crate::config::{EXTRACTED_TEXT_DATASTREAM, RepoConfig};

/// Where an item's extracted text can be fetched from.
///
/// `size` is the metadata-advertised byte count and may be unknown until
/// the bytes are actually streamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLocation {
    pub url: String,
    pub size: Option<u64>,
}

/// Resolve the extracted-text location for an item, first match wins:
/// a direct `links.content_datastreams` link, then a `links.datastreams`
/// link, then a bare `datastreams` size descriptor with the storage URL
/// constructed from the item pid.
pub fn resolve_text_location(item: &Value, pid: &str, config: &RepoConfig) -> Option<TextLocation> {
    let links = item.get("links");

    if let Some(url) = datastream_link(links, "content_datastreams") {
        return Some(TextLocation {
            url: url.to_string(),
            size: size_from_datastreams(item),
        });
    }

    // some records expose the link under links.datastreams instead
    if let Some(url) = datastream_link(links, "datastreams") {
        return Some(TextLocation {
            url: url.to_string(),
            size: size_from_datastreams(item),
        });
    }

    // last resort: a datastreams descriptor with a size but no link
    if item
        .get("datastreams")
        .and_then(|ds| ds.get(EXTRACTED_TEXT_DATASTREAM))
        .is_some_and(Value::is_object)
    {
        return Some(TextLocation {
            url: config.storage_text_url(pid),
            size: size_from_datastreams(item),
        });
    }

    None
}

fn datastream_link<'a>(links: Option<&'a Value>, key: &str) -> Option<&'a str> {
    links?
        .get(key)?
        .get(EXTRACTED_TEXT_DATASTREAM)?
        .as_str()
}

/// Extracted-text size from the `datastreams` block; accepts both integer
/// and digit-string encodings.
fn size_from_datastreams(item: &Value) -> Option<u64> {
    let entry = item
        .get("datastreams")?
        .get(EXTRACTED_TEXT_DATASTREAM)?;
    match entry.get("size")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) => {
            s.parse().ok()
        }
        _ => None,
    }
}

/// Child item pids from `relations.hasPart`, in server order. Entries may
/// be bare pid strings or objects carrying `pid` or `id`.
pub fn extract_child_pids(item: &Value) -> Vec<String> {
    let Some(has_part) = item
        .get("relations")
        .and_then(|r| r.get("hasPart"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    has_part
        .iter()
        .filter_map(|entry| match entry {
            Value::String(pid) => Some(pid.clone()),
            Value::Object(map) => map
                .get("pid")
                .or_else(|| map.get("id"))
                .and_then(Value::as_str)
                .map(str::to_string),
            _ => None,
        })
        .collect()
}

/// Display title for an item; falls back through the MODS title field.
pub fn primary_title(item: &Value) -> String {
    item.get("primary_title")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .or_else(|| {
            item.get("mods_title_full_primary_tsi")
                .and_then(Value::as_str)
        })
        .unwrap_or_default()
        .to_string()
}

/// Human-browsable URL for an item; metadata `uri` when present, otherwise
/// the studio template.
pub fn studio_url(item: &Value, pid: &str, config: &RepoConfig) -> String {
    item.get("uri")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| config.studio_item_url(pid))
}
