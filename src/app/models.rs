//! Data models for archive records and manifest entries
//!
//! Folder and item records mirror the JSON documents returned by the
//! archive's listing endpoints. Only the fields the manifest needs are
//! modelled; everything else in the documents is ignored.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::archive;

/// Opaque identifier of an archive resource (folder or item)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A resource document returned by path resolution
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceRef {
    #[serde(rename = "_id")]
    pub id: Option<ResourceId>,
    #[serde(rename = "_modelType", default)]
    pub model_type: Option<String>,
}

/// A folder record from a folder listing
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FolderRef {
    #[serde(rename = "_id")]
    pub id: ResourceId,
    #[serde(default)]
    pub name: Option<String>,
}

/// An item record from an item listing
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ItemRef {
    #[serde(rename = "_id")]
    pub id: ResourceId,
    pub name: String,
    /// Free-form item metadata; absent or `null` is treated as empty
    #[serde(rename = "meta", default)]
    pub metadata: Option<HashMap<String, Value>>,
}

impl ItemRef {
    /// Item checksum from metadata, or an empty string when there is none
    ///
    /// String values are returned as-is; other JSON scalars are rendered in
    /// their JSON text form. `null` counts as missing.
    pub fn checksum(&self) -> String {
        match self
            .metadata
            .as_ref()
            .and_then(|meta| meta.get(archive::CHECKSUM_META_KEY))
        {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

/// One manifest row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub checksum: String,
    pub download_url: String,
}

impl ManifestEntry {
    /// Build the entry for an item, deriving its download URL from `api_base`
    pub fn from_item(item: &ItemRef, api_base: &str) -> Self {
        Self {
            name: item.name.clone(),
            checksum: item.checksum(),
            download_url: download_url(api_base, &item.id),
        }
    }

    /// Fields in output column order
    pub fn fields(&self) -> [&str; 3] {
        [&self.name, &self.checksum, &self.download_url]
    }
}

/// Download URL for an item: `<api_base>item/<id>/download`
///
/// A missing trailing slash on `api_base` is tolerated.
pub fn download_url(api_base: &str, item_id: &ResourceId) -> String {
    let separator = if api_base.ends_with('/') { "" } else { "/" };
    format!("{api_base}{separator}item/{item_id}/download")
}

/// Counters collected while building a manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestStats {
    /// Subject folders visited
    pub subjects: usize,
    /// Entries produced
    pub entries: usize,
    /// Entries whose checksum is empty
    pub missing_checksums: usize,
}

/// Ordered manifest in collaborator order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
    stats: ManifestStats,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a manifest from already-built entries
    pub fn from_entries(entries: Vec<ManifestEntry>) -> Self {
        let mut manifest = Self::new();
        for entry in entries {
            manifest.push(entry);
        }
        manifest
    }

    /// Append an entry, keeping counters current
    pub fn push(&mut self, entry: ManifestEntry) {
        self.stats.entries += 1;
        if entry.checksum.is_empty() {
            self.stats.missing_checksums += 1;
        }
        self.entries.push(entry);
    }

    pub(crate) fn record_subject(&mut self) {
        self.stats.subjects += 1;
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ManifestEntry> {
        self.entries
    }

    pub fn stats(&self) -> &ManifestStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: Value) -> ItemRef {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_item_with_checksum() {
        let item = item(json!({
            "_id": "x1",
            "name": "trial1.nwb",
            "meta": {"md5": "abc123", "subject": "mouse1"},
            "size": 1024
        }));
        assert_eq!(item.id.as_str(), "x1");
        assert_eq!(item.checksum(), "abc123");
    }

    #[test]
    fn test_missing_checksum_is_empty() {
        assert_eq!(item(json!({"_id": "x2", "name": "a", "meta": {}})).checksum(), "");
        assert_eq!(item(json!({"_id": "x3", "name": "b"})).checksum(), "");
        assert_eq!(item(json!({"_id": "x4", "name": "c", "meta": null})).checksum(), "");
        assert_eq!(
            item(json!({"_id": "x5", "name": "d", "meta": {"md5": null}})).checksum(),
            ""
        );
    }

    #[test]
    fn test_non_string_checksum_rendered() {
        let item = item(json!({"_id": "x6", "name": "e", "meta": {"md5": 42}}));
        assert_eq!(item.checksum(), "42");
    }

    #[test]
    fn test_folder_name_optional() {
        let folder: FolderRef = serde_json::from_value(json!({"_id": "f1"})).unwrap();
        assert_eq!(folder.id, ResourceId::from("f1"));
        assert!(folder.name.is_none());
    }

    #[test]
    fn test_download_url_format() {
        let id = ResourceId::from("x1");
        assert_eq!(
            download_url("https://host/api/v1/", &id),
            "https://host/api/v1/item/x1/download"
        );
        assert_eq!(
            download_url("https://host/api/v1", &id),
            "https://host/api/v1/item/x1/download"
        );
    }

    #[test]
    fn test_manifest_stats_track_pushes() {
        let mut manifest = Manifest::new();
        manifest.record_subject();
        manifest.push(ManifestEntry {
            name: "a.nwb".to_string(),
            checksum: "abc".to_string(),
            download_url: "u1".to_string(),
        });
        manifest.push(ManifestEntry {
            name: "b.nwb".to_string(),
            checksum: String::new(),
            download_url: "u2".to_string(),
        });

        assert_eq!(manifest.len(), 2);
        assert_eq!(
            manifest.stats(),
            &ManifestStats {
                subjects: 1,
                entries: 2,
                missing_checksums: 1
            }
        );
        assert_eq!(manifest.entries()[1].fields(), ["b.nwb", "", "u2"]);
    }
}
