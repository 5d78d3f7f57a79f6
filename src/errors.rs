//! Error types for the DANDI manifest generator
//!
//! Errors are grouped by the phase in which they occur: authentication,
//! dataset resolution, folder traversal, manifest output and configuration.
//! Every phase error is fatal; nothing is retried above the transport layer.

use std::path::PathBuf;
use thiserror::Error;

/// Transport-level request failures shared by every archive call
#[derive(Error, Debug)]
pub enum RequestError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned a non-success status
    #[error("Server returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// Rate limit exceeded after retries
    #[error("Rate limit exceeded. Server responded with HTTP 429")]
    RateLimitExceeded,

    /// Server overloaded after retries
    #[error("Server overloaded. Server responded with HTTP 503")]
    ServerOverloaded,

    /// Maximum retries exceeded
    #[error("Maximum retry attempts ({max_retries}) exceeded for {url}")]
    MaxRetriesExceeded { max_retries: u32, url: String },

    /// Invalid URL constructed for a request
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Response body could not be decoded
    #[error("Unexpected response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },
}

impl RequestError {
    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Status { status, .. } => Some(*status),
            RequestError::RateLimitExceeded => Some(429),
            RequestError::ServerOverloaded => Some(503),
            _ => None,
        }
    }
}

/// Authentication-related errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// API key not available
    #[error("Missing DANDI API key. Set DANDI_API_KEY or run 'auth setup'")]
    MissingApiKey,

    /// API key rejected by the archive
    #[error("DANDI API key rejected by the archive (HTTP {status})")]
    Rejected { status: u16 },

    /// Invalid API key format
    #[error("Invalid API key: {reason}")]
    InvalidApiKey { reason: String },

    /// Token response did not contain a token
    #[error("Authentication response did not contain a token: {reason}")]
    MalformedToken { reason: String },

    /// Transport failure during authentication
    #[error("Authentication request failed: {0}")]
    Request(#[from] RequestError),

    /// HTTP client construction failed
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// Rate limiter configuration invalid
    #[error("Invalid client configuration: {reason}")]
    InvalidClientConfig { reason: String },

    /// File I/O error during credential storage
    #[error("Failed to save credentials to file")]
    CredentialStorage(#[from] std::io::Error),
}

/// Dataset resolution errors
#[derive(Error, Debug)]
pub enum ResolveError {
    /// No resource found at the path
    #[error("Dataset not found in archive: {path}")]
    NotFound { path: String },

    /// Access to the resource refused
    #[error("Access denied to dataset: {path}")]
    AccessDenied { path: String },

    /// Resource found but it has no identifier
    #[error("Resource at {path} has no identifier")]
    MissingId { path: String },

    /// Transport failure during resolution
    #[error("Dataset resolution failed: {0}")]
    Request(#[from] RequestError),
}

/// Folder and item listing errors raised while walking a dataset
#[derive(Error, Debug)]
pub enum TraversalError {
    /// Listing child folders failed
    #[error("Failed to list folders under {folder_id}: {source}")]
    ListFolders {
        folder_id: String,
        #[source]
        source: RequestError,
    },

    /// Listing items failed
    #[error("Failed to list items in folder {folder_id}: {source}")]
    ListItems {
        folder_id: String,
        #[source]
        source: RequestError,
    },
}

/// Manifest file output and parsing errors
#[derive(Error, Debug)]
pub enum ManifestError {
    /// I/O error writing or reading the manifest
    #[error("Manifest I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Atomic rename failed
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
    },

    /// Header row missing or different
    #[error("Invalid manifest header: expected '{expected}', found '{found}'")]
    InvalidHeader { expected: String, found: String },

    /// Record could not be parsed
    #[error("Invalid manifest format at line {line}: {reason}")]
    InvalidFormat { line: usize, reason: String },

    /// Manifest file not found
    #[error("Manifest file not found: {path}")]
    NotFound { path: PathBuf },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Configuration file unreadable
    #[error("Failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidFormat(#[from] toml::de::Error),

    /// Missing required configuration field
    #[error("Missing required configuration field: {field}")]
    MissingField { field: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// User configuration directory unavailable
    #[error("Could not determine user config directory")]
    NoConfigDir,
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Authentication error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Resolution error
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Traversal error
    #[error(transparent)]
    Traversal(#[from] TraversalError),

    /// Manifest output error
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is transient, i.e. a rerun may succeed
    pub fn is_recoverable(&self) -> bool {
        let request = match self {
            AppError::Auth(AuthError::Request(e)) => e,
            AppError::Resolve(ResolveError::Request(e)) => e,
            AppError::Traversal(TraversalError::ListFolders { source, .. })
            | AppError::Traversal(TraversalError::ListItems { source, .. }) => source,
            _ => return false,
        };

        matches!(
            request,
            RequestError::Http(_)
                | RequestError::RateLimitExceeded
                | RequestError::ServerOverloaded
                | RequestError::MaxRetriesExceeded { .. }
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "authentication",
            AppError::Resolve(_) => "resolution",
            AppError::Traversal(_) => "traversal",
            AppError::Manifest(_) => "manifest",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Request result type alias
pub type RequestResult<T> = std::result::Result<T, RequestError>;

/// Authentication result type alias
pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Resolution result type alias
pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

/// Traversal result type alias
pub type TraversalResult<T> = std::result::Result<T, TraversalError>;

/// Manifest result type alias
pub type ManifestResult<T> = std::result::Result<T, ManifestError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(
            AppError::from(AuthError::MissingApiKey).category(),
            "authentication"
        );
        assert_eq!(
            AppError::from(ResolveError::NotFound {
                path: "dandi/000023".to_string()
            })
            .category(),
            "resolution"
        );
        assert_eq!(AppError::generic("boom").category(), "generic");
    }

    #[test]
    fn test_recoverable_classification() {
        let overloaded = AppError::from(TraversalError::ListItems {
            folder_id: "abc".to_string(),
            source: RequestError::ServerOverloaded,
        });
        assert!(overloaded.is_recoverable());

        let forbidden = AppError::from(TraversalError::ListFolders {
            folder_id: "abc".to_string(),
            source: RequestError::Status {
                status: 403,
                url: "https://host/api/v1/folder".to_string(),
            },
        });
        assert!(!forbidden.is_recoverable());

        assert!(!AppError::from(AuthError::Rejected { status: 401 }).is_recoverable());
    }

    #[test]
    fn test_transparent_messages() {
        let err = AppError::from(ResolveError::NotFound {
            path: "dandi/999999".to_string(),
        });
        assert_eq!(err.to_string(), "Dataset not found in archive: dandi/999999");

        let err = TraversalError::ListItems {
            folder_id: "f1".to_string(),
            source: RequestError::Status {
                status: 500,
                url: "https://host/api/v1/item".to_string(),
            },
        };
        assert!(err.to_string().contains("f1"));
        assert!(err.to_string().contains("HTTP 500"));
    }

    #[test]
    fn test_request_error_status() {
        assert_eq!(RequestError::RateLimitExceeded.status(), Some(429));
        assert_eq!(
            RequestError::Status {
                status: 404,
                url: String::new()
            }
            .status(),
            Some(404)
        );
        assert_eq!(
            RequestError::InvalidResponse {
                url: String::new(),
                reason: String::new()
            }
            .status(),
            None
        );
    }
}
