//! Application constants for the DANDI manifest generator
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain.

use std::time::Duration;

/// Environment variable names
pub mod env {
    /// Environment variable holding the archive API key
    pub const API_KEY: &str = "DANDI_API_KEY";

    /// Optional override for the archive API base URL
    pub const API_URL: &str = "DANDI_API_URL";

    /// Optional override for the dataset identifier
    pub const DATASET: &str = "DANDI_DATASET";
}

/// Archive service defaults and endpoint paths
pub mod archive {
    /// Default archive REST API base URL
    pub const DEFAULT_API_URL: &str = "https://girder.dandiarchive.org/api/v1";

    /// Default namespace under which datasets are resolved
    pub const DEFAULT_NAMESPACE: &str = "dandi";

    /// Endpoint exchanging an API key for a session token
    pub const TOKEN_ENDPOINT: &str = "api_key/token";

    /// Folder listing endpoint
    pub const FOLDER_ENDPOINT: &str = "folder";

    /// Item listing endpoint
    pub const ITEM_ENDPOINT: &str = "item";

    /// Header carrying the session token on authenticated requests
    pub const TOKEN_HEADER: &str = "Girder-Token";

    /// Metadata key holding an item's checksum
    pub const CHECKSUM_META_KEY: &str = "md5";

    /// Default number of records requested per listing page
    pub const DEFAULT_PAGE_SIZE: usize = 50;
}

/// Authentication and credential-related constants
pub mod auth {
    /// Minimum accepted API key length
    pub const MIN_API_KEY_LENGTH: usize = 16;

    /// Maximum accepted API key length
    pub const MAX_API_KEY_LENGTH: usize = 128;

    /// File permissions for .env file (Unix only) - owner read/write only
    #[cfg(unix)]
    pub const ENV_FILE_PERMISSIONS: u32 = 0o600;
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("DANDI-Manifest/", env!("CARGO_PKG_VERSION"));

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
}

/// Rate limiting and retry configuration
pub mod limits {
    /// Default rate limit for archive requests (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 10;

    /// Maximum retry attempts for failed requests
    pub const MAX_RETRIES: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const RETRY_BASE_DELAY_MS: u64 = 1000;
}

/// Manifest file layout
pub mod manifest {
    /// CSV header row
    pub const HEADER: &str = "name,md5,download_url";

    /// Output file name prefix
    pub const FILE_PREFIX: &str = "dandiset_";

    /// Output file name suffix
    pub const FILE_SUFFIX: &str = "_manifest.csv";

    /// Temporary file suffix for atomic writes
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";
}

/// Configuration file locations
pub mod config {
    /// Project-local configuration file name
    pub const LOCAL_FILE_NAME: &str = "dandi-manifest.toml";

    /// Directory under the user config dir
    pub const USER_DIR_NAME: &str = "dandi-manifest";

    /// File name inside the user config directory
    pub const USER_FILE_NAME: &str = "config.toml";
}

// Re-export commonly used constants at module level
pub use archive::{DEFAULT_API_URL, DEFAULT_NAMESPACE, DEFAULT_PAGE_SIZE};
pub use env::API_KEY as ENV_API_KEY;
pub use http::USER_AGENT;
pub use limits::DEFAULT_RATE_LIMIT_RPS;
