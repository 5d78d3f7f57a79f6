//! DANDI Manifest Library
//!
//! Builds download manifests for datasets hosted on the DANDI neuroscience
//! archive. A dataset is resolved to its root folder, every subject folder
//! below it is listed, and each file becomes one `name,md5,download_url`
//! row of a CSV manifest.

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;

pub use errors::{AppError, Result};
