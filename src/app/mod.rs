//! Core application logic for the DANDI manifest generator
//!
//! This module contains the archive client, the record models and the
//! manifest traversal and output.
//!
//! # Examples
//!
//! ```rust,no_run
//! use dandi_manifest::app::{ArchiveClient, ClientConfig, GirderClient, ManifestBuilder, render_csv};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let api_url = Url::parse("https://girder.dandiarchive.org/api/v1")?;
//! let client = GirderClient::new(api_url, &ClientConfig::default())?;
//!
//! let root = client.resolve_resource_id("dandi/000023").await?;
//! let manifest = ManifestBuilder::new(&client).build(&root).await?;
//! println!("{}", render_csv(&manifest));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod manifest;
pub mod models;

// Re-export main public API
pub use client::{ArchiveClient, ClientConfig, GirderClient};
pub use manifest::{
    manifest_file_name, parse_manifest_csv, read_manifest, render_csv, write_manifest,
    ManifestBuilder,
};
pub use models::{
    download_url, FolderRef, ItemRef, Manifest, ManifestEntry, ManifestStats, ResourceId,
};
