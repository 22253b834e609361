//! Tag-list splitting (RFC 7489 §6.4). No validation happens here.

use std::collections::BTreeMap;

use tracing::debug;

use super::types::Tag;

/// Raw value of one tag, after list post-processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// Tag written without `=`.
    Missing,
    Scalar(String),
    List(Vec<String>),
}

/// Tag name (lowercased) → raw value. Duplicate tags: the last one wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagMap {
    tags: BTreeMap<String, RawValue>,
}

impl TagMap {
    pub fn get(&self, tag: Tag) -> Option<&RawValue> {
        self.tags.get(tag.name())
    }

    pub fn get_name(&self, name: &str) -> Option<&RawValue> {
        self.tags.get(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Tag names that are not DMARC tags.
    pub fn unknown_tags(&self) -> impl Iterator<Item = &str> {
        self.tags
            .keys()
            .map(String::as_str)
            .filter(|name| Tag::from_name(name).is_none())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Split a raw DMARC TXT value into tags.
///
/// Segments are separated by `;`; each is split on its first `=`.
/// `rua`/`ruf` values are split on `,` and `fo` on `:`.
pub fn parse_tags(record: &str) -> TagMap {
    let mut tags = BTreeMap::new();
    for part in record.split(';') {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            continue;
        }
        let (name, value) = match trimmed.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value.trim())),
            None => (trimmed, None),
        };
        if name.is_empty() {
            debug!(segment = trimmed, "skipping DMARC tag without a name");
            continue;
        }
        let name = name.to_ascii_lowercase();
        let raw = match (value, Tag::from_name(&name).and_then(Tag::list_separator)) {
            (None, _) => RawValue::Missing,
            (Some(value), Some(sep)) => RawValue::List(split_list(value, sep)),
            (Some(value), None) => RawValue::Scalar(value.to_string()),
        };
        tags.insert(name, raw);
    }
    TagMap { tags }
}

/// Trailing empty items are dropped, so `":"` and `""` both yield no items.
fn split_list(value: &str, sep: char) -> Vec<String> {
    let mut items: Vec<String> = value.split(sep).map(|item| item.trim().to_string()).collect();
    while items.last().is_some_and(String::is_empty) {
        items.pop();
    }
    items
}
