#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

use crate::{ReviewError, Result};

/// Metadata stored for one index slot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub pdf_path: Option<String>,
    pub text_excerpt: Option<String>,
    pub title: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub link: Option<String>,
    pub published: Option<String>,
    /// Full text cached by ingestion or fetch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_path: Option<String>,
    /// GROBID references cached by ingestion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refs_path: Option<String>,
}

impl IndexEntry {
    /// File name used to refer to the document in reports
    #[inline]
    pub fn display_name(&self) -> String {
        self.pdf_path
            .as_deref()
            .or(self.text_path.as_deref())
            .and_then(|p| Path::new(p).file_name())
            .map_or_else(
                || self.title.clone().unwrap_or_default(),
                |name| name.to_string_lossy().into_owned(),
            )
    }
}

/// Slot id to metadata side-table of a vector index.
///
/// Written as a JSON object keyed by decimal slot id. Reading also accepts a
/// JSON list (slot = position) and keys in any order, but never gaps or
/// duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexMapping {
    entries: Vec<IndexEntry>,
}

impl IndexMapping {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn from_entries(entries: Vec<IndexEntry>) -> Self {
        Self { entries }
    }

    /// Append an entry and return its slot id
    #[inline]
    pub fn push(&mut self, entry: IndexEntry) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    #[inline]
    pub fn get(&self, slot: usize) -> Option<&IndexEntry> {
        self.entries.get(slot)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (usize, &IndexEntry)> {
        self.entries.iter().enumerate()
    }

    #[inline]
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        debug!("Saved mapping with {} entries to {}", self.len(), path.display());
        Ok(())
    }

    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ReviewError::missing("index mapping", path));
        }
        let content = fs::read_to_string(path)?;
        let mapping: Self = serde_json::from_str(&content).map_err(|e| {
            ReviewError::Index(format!("Invalid mapping {}: {}", path.display(), e))
        })?;
        debug!("Loaded mapping with {} entries from {}", mapping.len(), path.display());
        Ok(mapping)
    }
}

impl Serialize for IndexMapping {
    #[inline]
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (slot, entry) in self.iter() {
            map.serialize_entry(&slot.to_string(), entry)?;
        }
        map.end()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMapping {
    List(Vec<IndexEntry>),
    Keyed(HashMap<String, IndexEntry>),
}

impl<'de> Deserialize<'de> for IndexMapping {
    #[inline]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match RawMapping::deserialize(deserializer)? {
            RawMapping::List(entries) => Ok(Self { entries }),
            RawMapping::Keyed(keyed) => {
                let mut ordered = BTreeMap::new();
                for (key, entry) in keyed {
                    let slot = parse_slot_key(&key).map_err(D::Error::custom)?;
                    if ordered.insert(slot, entry).is_some() {
                        return Err(D::Error::custom(format!("duplicate slot id {}", slot)));
                    }
                }

                if let Some((position, slot)) = ordered
                    .keys()
                    .enumerate()
                    .find(|(position, slot)| *position != **slot)
                {
                    return Err(D::Error::custom(format!(
                        "slot ids are not contiguous: expected {}, found {}",
                        position, slot
                    )));
                }

                Ok(Self {
                    entries: ordered.into_values().collect(),
                })
            }
        }
    }
}

/// Interpret a mapping key as a slot id
#[inline]
pub fn parse_slot_key(key: &str) -> std::result::Result<usize, String> {
    key.trim()
        .parse::<usize>()
        .map_err(|_| format!("mapping key {:?} is not a slot id", key))
}

/// Raw keys of a mapping file without validating them, for consistency reports
#[inline]
pub fn read_slot_keys(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(ReviewError::missing("index mapping", path));
    }

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(path)?)?;
    match value {
        serde_json::Value::Array(items) => Ok((0..items.len()).map(|i| i.to_string()).collect()),
        serde_json::Value::Object(map) => Ok(map.keys().cloned().collect()),
        _ => Err(ReviewError::Index(format!(
            "Mapping {} is neither a list nor an object",
            path.display()
        ))),
    }
}
