//! Configuration management for the DANDI manifest generator
//!
//! Settings are layered: built-in defaults, then a TOML config file, then
//! environment variables, then command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::app::client::{normalize_api_url, ClientConfig};
use crate::constants::{archive, config as config_paths, env as env_constants, http, limits};
use crate::errors::{ConfigError, ConfigResult};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Archive location and dataset selection
    pub archive: ArchiveConfigToml,
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Output settings
    pub output: OutputConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Archive and dataset settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfigToml {
    /// REST API base URL
    pub api_url: String,
    /// Namespace datasets are resolved under
    pub namespace: String,
    /// Dataset identifier (no default; must be supplied)
    pub dataset: Option<String>,
}

impl Default for ArchiveConfigToml {
    fn default() -> Self {
        Self {
            api_url: archive::DEFAULT_API_URL.to_string(),
            namespace: archive::DEFAULT_NAMESPACE.to_string(),
            dataset: None,
        }
    }
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// Request timeout, e.g. "60s"
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Connect timeout
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Connection pool idle timeout (None = no timeout)
    #[serde(with = "humantime_serde")]
    pub pool_idle_timeout: Option<Duration>,
    /// TCP nodelay setting
    pub tcp_nodelay: bool,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
    /// Records requested per listing page
    pub page_size: usize,
    /// Retry attempts for throttled or failed requests
    pub max_retries: u32,
    /// Base delay for exponential backoff
    #[serde(with = "humantime_serde")]
    pub retry_base_delay: Duration,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            pool_idle_timeout: Some(http::POOL_IDLE_TIMEOUT),
            tcp_nodelay: true,
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
            page_size: archive::DEFAULT_PAGE_SIZE,
            max_retries: limits::MAX_RETRIES,
            retry_base_delay: Duration::from_millis(limits::RETRY_BASE_DELAY_MS),
        }
    }
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct OutputConfigToml {
    /// Directory the manifest is written to (empty = current directory)
    pub directory: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level used when no verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Validated settings for one manifest run
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveSettings {
    /// API base URL, always ending in '/'
    pub api_url: Url,
    pub namespace: String,
    pub dataset: String,
    pub output_dir: PathBuf,
}

impl ArchiveSettings {
    /// Path resolved by the archive to the dataset root: `<namespace>/<dataset>`
    pub fn resource_path(&self) -> String {
        format!("{}/{}", self.namespace, self.dataset)
    }

    /// Destination of the manifest file
    pub fn manifest_path(&self) -> PathBuf {
        self.output_dir
            .join(crate::app::manifest::manifest_file_name(&self.dataset))
    }
}

impl AppConfig {
    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (explicit path, else the first standard location found)
    /// 3. Environment variables
    ///
    /// CLI flags are applied afterwards by the command handlers.
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path });
                }
                Some(path)
            }
            None => Self::find_config_file(),
        };

        let mut config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies environment overrides through `lookup`
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(api_url) = lookup(env_constants::API_URL) {
            debug!("Using API URL from {}", env_constants::API_URL);
            self.archive.api_url = api_url;
        }
        if let Some(dataset) = lookup(env_constants::DATASET) {
            debug!("Using dataset from {}", env_constants::DATASET);
            self.archive.dataset = Some(dataset);
        }
    }

    /// Validated API base URL, normalized to end with '/'
    pub fn api_url(&self) -> ConfigResult<Url> {
        parse_api_url(&self.archive.api_url)
    }

    /// Validates the archive section into runtime settings
    pub fn archive_settings(&self) -> ConfigResult<ArchiveSettings> {
        let api_url = self.api_url()?;

        let namespace = self.archive.namespace.trim().trim_matches('/');
        validate_path_segment("archive.namespace", namespace)?;

        let dataset = self
            .archive
            .dataset
            .as_deref()
            .map(str::trim)
            .filter(|dataset| !dataset.is_empty())
            .ok_or_else(|| ConfigError::MissingField {
                field: "archive.dataset (use --dataset or DANDI_DATASET)".to_string(),
            })?;
        validate_path_segment("archive.dataset", dataset)?;

        let output_dir = if self.output.directory.as_os_str().is_empty() {
            PathBuf::from(".")
        } else {
            self.output.directory.clone()
        };

        Ok(ArchiveSettings {
            api_url,
            namespace: namespace.to_string(),
            dataset: dataset.to_string(),
            output_dir,
        })
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(config_paths::LOCAL_FILE_NAME)];
        if let Ok(user_path) = Self::get_default_config_path() {
            search_paths.push(user_path);
        }

        let found = search_paths.into_iter().find(|path| path.exists());
        match &found {
            Some(path) => debug!("Found config file: {}", path.display()),
            None => debug!("No config file found in standard locations"),
        }
        found
    }

    /// Get the default config file path for the current user
    pub fn get_default_config_path() -> ConfigResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir
            .join(config_paths::USER_DIR_NAME)
            .join(config_paths::USER_FILE_NAME))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let config: AppConfig = toml::from_str(&content)?;

        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    /// Writes the default configuration file to `path`
    ///
    /// Returns `false` without touching the file if it exists and `force` is
    /// not set.
    pub async fn write_default(path: &Path, force: bool) -> ConfigResult<bool> {
        if path.exists() && !force {
            return Ok(false);
        }

        let io_error = |source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(io_error)?;
            }
        }
        tokio::fs::write(path, Self::generate_default_config_content())
            .await
            .map_err(io_error)?;

        info!("Wrote default configuration to {}", path.display());
        Ok(true)
    }

    /// Default configuration content with comments
    pub fn generate_default_config_content() -> String {
        format!(
            r#"# DANDI Manifest Configuration
# Values here are overridden by DANDI_API_URL / DANDI_DATASET and by
# command-line flags.

[archive]
api_url = "{}"
namespace = "{}"
# dataset = "000023"

[client]
request_timeout = "{}s"
connect_timeout = "{}s"
pool_idle_timeout = "{}s"
tcp_nodelay = true
rate_limit_rps = {}
page_size = {}
max_retries = {}
retry_base_delay = "{}ms"

[output]
# Empty = current directory
directory = ""

[logging]
level = "warn"  # error, warn, info, debug, trace
"#,
            archive::DEFAULT_API_URL,
            archive::DEFAULT_NAMESPACE,
            http::DEFAULT_TIMEOUT.as_secs(),
            http::CONNECT_TIMEOUT.as_secs(),
            http::POOL_IDLE_TIMEOUT.as_secs(),
            limits::DEFAULT_RATE_LIMIT_RPS,
            archive::DEFAULT_PAGE_SIZE,
            limits::MAX_RETRIES,
            limits::RETRY_BASE_DELAY_MS,
        )
    }
}

impl ArchiveConfigToml {
    /// Applies command-line overrides on top of file and environment values
    pub fn apply_overrides(
        &mut self,
        dataset: Option<String>,
        api_url: Option<String>,
        namespace: Option<String>,
    ) {
        if let Some(dataset) = dataset {
            self.dataset = Some(dataset);
        }
        if let Some(api_url) = api_url {
            self.api_url = api_url;
        }
        if let Some(namespace) = namespace {
            self.namespace = namespace;
        }
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            tcp_nodelay: self.tcp_nodelay,
            pool_idle_timeout: self.pool_idle_timeout,
            request_timeout: self.request_timeout,
            connect_timeout: self.connect_timeout,
            rate_limit_rps: self.rate_limit_rps,
            page_size: self.page_size,
            max_retries: self.max_retries,
            retry_base_delay: self.retry_base_delay,
        }
    }
}

fn parse_api_url(raw: &str) -> ConfigResult<Url> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        field: "archive.api_url".to_string(),
        value: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("URL scheme must be http or https".to_string()));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("URL must not carry a query or fragment".to_string()));
    }
    Ok(normalize_api_url(url))
}

fn validate_path_segment(field: &str, value: &str) -> ConfigResult<()> {
    let reason = if value.is_empty() {
        Some("must not be empty")
    } else if value.contains('/') || value.contains('\\') {
        Some("must not contain path separators")
    } else if value == "." || value == ".." {
        Some("must not be a relative path component")
    } else if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        Some("must not contain whitespace")
    } else if value.contains(['?', '#', '%']) {
        Some("must not contain URL-reserved characters ('?', '#', '%')")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn with_dataset(dataset: &str) -> AppConfig {
        let mut config = AppConfig::default();
        config.archive.dataset = Some(dataset.to_string());
        config
    }

    #[test]
    fn test_default_config_creation() {
        let config = AppConfig::default();
        assert_eq!(config.archive.api_url, archive::DEFAULT_API_URL);
        assert_eq!(config.archive.namespace, "dandi");
        assert!(config.archive.dataset.is_none());
        assert_eq!(config.client.rate_limit_rps, limits::DEFAULT_RATE_LIMIT_RPS);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_config_file_generation() {
        let content = AppConfig::generate_default_config_content();
        let parsed: AppConfig = toml::from_str(&content).unwrap();

        assert_eq!(parsed.client.request_timeout, http::DEFAULT_TIMEOUT);
        assert_eq!(parsed.client.page_size, archive::DEFAULT_PAGE_SIZE);
        assert_eq!(
            parsed.client.retry_base_delay,
            Duration::from_millis(limits::RETRY_BASE_DELAY_MS)
        );
        assert!(content.contains("[archive]"));
        assert!(content.contains("[client]"));
    }

    #[tokio::test]
    async fn test_config_loading_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let result = AppConfig::load(Some(config_path)).await;
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_partial_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("partial.toml");
        tokio::fs::write(
            &config_path,
            r#"
[archive]
dataset = "000023"

[client]
request_timeout = "2m"
page_size = 100
"#,
        )
        .await
        .unwrap();

        let config = AppConfig::load_from_file(&config_path).await.unwrap();

        assert_eq!(config.archive.dataset.as_deref(), Some("000023"));
        assert_eq!(config.archive.api_url, archive::DEFAULT_API_URL);
        assert_eq!(config.client.request_timeout, Duration::from_secs(120));
        assert_eq!(config.client.page_size, 100);
        assert_eq!(config.client.max_retries, limits::MAX_RETRIES);
    }

    #[tokio::test]
    async fn test_invalid_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bad.toml");
        tokio::fs::write(&config_path, "[client]\npage_size = \"many\"\n")
            .await
            .unwrap();

        let result = AppConfig::load_from_file(&config_path).await;
        assert!(matches!(result, Err(ConfigError::InvalidFormat(_))));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (env_constants::API_URL, "https://mirror.example.org/api/v1"),
            (env_constants::DATASET, "000042"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.archive.api_url, "https://mirror.example.org/api/v1");
        assert_eq!(config.archive.dataset.as_deref(), Some("000042"));
    }

    #[test]
    fn test_blank_env_values_ignored() {
        let mut config = with_dataset("000023");
        config.apply_env_overrides(|_| Some("   ".to_string()));
        assert_eq!(config.archive.dataset.as_deref(), Some("000023"));
        assert_eq!(config.archive.api_url, archive::DEFAULT_API_URL);
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut config = with_dataset("000023");
        config.archive.apply_overrides(
            Some("000099".to_string()),
            None,
            Some("other".to_string()),
        );
        assert_eq!(config.archive.dataset.as_deref(), Some("000099"));
        assert_eq!(config.archive.namespace, "other");
        assert_eq!(config.archive.api_url, archive::DEFAULT_API_URL);
    }

    #[test]
    fn test_archive_settings() {
        let settings = with_dataset("000023").archive_settings().unwrap();

        assert_eq!(settings.api_url.as_str(), "https://girder.dandiarchive.org/api/v1/");
        assert_eq!(settings.resource_path(), "dandi/000023");
        assert_eq!(
            settings.manifest_path(),
            PathBuf::from(".").join("dandiset_000023_manifest.csv")
        );
    }

    #[test]
    fn test_archive_settings_requires_dataset() {
        let result = AppConfig::default().archive_settings();
        assert!(matches!(result, Err(ConfigError::MissingField { .. })));
    }

    #[test]
    fn test_archive_settings_rejects_bad_values() {
        assert!(with_dataset("../etc").archive_settings().is_err());
        assert!(with_dataset("0000 23").archive_settings().is_err());

        let mut config = with_dataset("000023");
        config.archive.api_url = "ftp://host/api".to_string();
        assert!(matches!(
            config.archive_settings(),
            Err(ConfigError::InvalidValue { .. })
        ));

        let mut config = with_dataset("000023");
        config.archive.namespace = String::new();
        assert!(config.archive_settings().is_err());
    }

    #[test]
    fn test_archive_settings_rejects_url_reserved_characters() {
        for dataset in ["000023?x", "000023#frag", "000023%2F"] {
            assert!(
                matches!(
                    with_dataset(dataset).archive_settings(),
                    Err(ConfigError::InvalidValue { .. })
                ),
                "{} should be rejected",
                dataset
            );
        }

        let mut config = with_dataset("000023");
        config.archive.namespace = "dandi?".to_string();
        assert!(config.archive_settings().is_err());
    }

    #[test]
    fn test_client_runtime_conversion() {
        let toml_config = ClientConfigToml {
            page_size: 7,
            pool_idle_timeout: None,
            ..Default::default()
        };
        let runtime = toml_config.to_runtime_config();
        assert_eq!(runtime.page_size, 7);
        assert!(runtime.pool_idle_timeout.is_none());
    }

    #[tokio::test]
    async fn test_write_default_respects_existing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");

        assert!(AppConfig::write_default(&path, false).await.unwrap());
        tokio::fs::write(&path, "# custom").await.unwrap();

        assert!(!AppConfig::write_default(&path, false).await.unwrap());
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "# custom");

        assert!(AppConfig::write_default(&path, true).await.unwrap());
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(content.contains("[archive]"));
    }
}
