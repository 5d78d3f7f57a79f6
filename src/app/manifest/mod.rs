//! Manifest generation and output
//!
//! - [`builder`] - walks a dataset root and collects one entry per item
//! - [`writer`] - renders entries as CSV, writes them atomically and parses
//!   them back
//!
//! # Examples
//!
//! ```rust,no_run
//! use dandi_manifest::app::client::{ArchiveClient, ClientConfig, GirderClient};
//! use dandi_manifest::app::manifest::{manifest_file_name, write_manifest, ManifestBuilder};
//! use url::Url;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let api_url = Url::parse("https://girder.dandiarchive.org/api/v1")?;
//! let client = GirderClient::from_env(api_url, &ClientConfig::default()).await?;
//!
//! let root = client.resolve_resource_id("dandi/000023").await?;
//! let manifest = ManifestBuilder::new(&client).build(&root).await?;
//!
//! let path = std::path::PathBuf::from(manifest_file_name("000023"));
//! write_manifest(&manifest, &path).await?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod writer;


pub use builder::ManifestBuilder;
pub use writer::{
    escape_field, manifest_file_name, parse_manifest_csv, read_manifest, render_csv,
    write_manifest,
};
