//! Two-level dataset traversal producing manifest entries

use crate::app::client::ArchiveClient;
use crate::app::models::{Manifest, ManifestEntry, ResourceId};
use crate::errors::{TraversalError, TraversalResult};

/// Walks a dataset root: subject folders first, then the items in each
///
/// The builder borrows an already-authenticated client and never mutates
/// remote state.
pub struct ManifestBuilder<'a, C: ArchiveClient + ?Sized> {
    client: &'a C,
}

impl<'a, C: ArchiveClient + ?Sized> ManifestBuilder<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Builds the manifest for the dataset rooted at `root_folder_id`
    ///
    /// Entries follow archive order: subject folders in listing order, items
    /// in listing order within each folder. Items without a checksum are kept
    /// with an empty checksum.
    ///
    /// # Errors
    ///
    /// Returns `TraversalError` as soon as any listing call fails; nothing
    /// collected up to that point is returned.
    pub async fn build(&self, root_folder_id: &ResourceId) -> TraversalResult<Manifest> {
        let api_base = self.client.api_base();

        let subjects = self
            .client
            .list_child_folders(root_folder_id)
            .await
            .map_err(|source| TraversalError::ListFolders {
                folder_id: root_folder_id.to_string(),
                source,
            })?;

        tracing::info!(
            "Found {} subject folders under {}",
            subjects.len(),
            root_folder_id
        );

        let mut manifest = Manifest::new();
        for subject in &subjects {
            let items = self
                .client
                .list_items(&subject.id)
                .await
                .map_err(|source| TraversalError::ListItems {
                    folder_id: subject.id.to_string(),
                    source,
                })?;

            tracing::debug!(
                "Subject {} ({}): {} items",
                subject.name.as_deref().unwrap_or("<unnamed>"),
                subject.id,
                items.len()
            );

            manifest.record_subject();
            for item in &items {
                manifest.push(ManifestEntry::from_item(item, api_base));
            }
        }

        let stats = manifest.stats();
        if stats.missing_checksums > 0 {
            tracing::warn!(
                "{} of {} items have no md5 checksum",
                stats.missing_checksums,
                stats.entries
            );
        }

        Ok(manifest)
    }
}
