//! HTTP client for the DANDI (Girder) archive REST API
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `auth`: API key to session token exchange
//! - `http`: Core HTTP operations with rate limiting and retries
//!
//! [`ArchiveClient`] is the interface the manifest builder consumes;
//! [`GirderClient`] implements it over HTTP.

use std::env;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use url::Url;

use crate::app::models::{FolderRef, ItemRef, ResourceId, ResourceRef};
use crate::constants::{archive, env as env_constants};
use crate::errors::{AuthError, AuthResult, RequestError, RequestResult, ResolveError, ResolveResult};

pub mod auth;
pub mod config;
pub mod http;

pub use config::ClientConfig;

use auth::AuthHandler;
use http::HttpHandler;

/// Read-only view of an archive folder hierarchy
#[async_trait]
pub trait ArchiveClient: Send + Sync {
    /// API base URL (with trailing slash) that item download URLs hang off
    fn api_base(&self) -> &str;

    /// Resolve a `<namespace>/<dataset>` path to the identifier of its root folder
    async fn resolve_resource_id(&self, path: &str) -> ResolveResult<ResourceId>;

    /// Immediate child folders of a folder, in archive order
    async fn list_child_folders(&self, folder_id: &ResourceId) -> RequestResult<Vec<FolderRef>>;

    /// Items directly inside a folder, in archive order
    async fn list_items(&self, folder_id: &ResourceId) -> RequestResult<Vec<ItemRef>>;
}

/// Ensures the API URL ends with a slash so relative endpoints join beneath it
pub fn normalize_api_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// HTTP client for the archive REST API
#[derive(Debug)]
pub struct GirderClient {
    http_handler: HttpHandler,
    api_url: Url,
    token: Option<String>,
    page_size: usize,
}

impl GirderClient {
    /// Creates a client without authenticating
    ///
    /// Public datasets can be listed without a token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the configuration is invalid or the HTTP client
    /// cannot be built
    pub fn new(api_url: Url, config: &ClientConfig) -> AuthResult<Self> {
        config.validate()?;
        let http_handler = HttpHandler::new(config)?;

        Ok(Self {
            http_handler,
            api_url: normalize_api_url(api_url),
            token: None,
            page_size: config.page_size,
        })
    }

    /// Creates a client and authenticates with the given API key
    pub async fn connect(api_url: Url, config: &ClientConfig, api_key: &str) -> AuthResult<Self> {
        let mut client = Self::new(api_url, config)?;
        client.authenticate(api_key).await?;
        Ok(client)
    }

    /// Creates a client authenticated with the key in `DANDI_API_KEY`
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingApiKey` if the variable is unset or empty
    pub async fn from_env(api_url: Url, config: &ClientConfig) -> AuthResult<Self> {
        let api_key = env::var(env_constants::API_KEY)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(AuthError::MissingApiKey)?;
        Self::connect(api_url, config, &api_key).await
    }

    /// Exchanges the API key for a session token used on subsequent requests
    pub async fn authenticate(&mut self, api_key: &str) -> AuthResult<()> {
        let token = AuthHandler::exchange_api_key(&self.http_handler, &self.api_url, api_key).await?;
        self.token = Some(token);
        tracing::info!("Successfully authenticated with {}", self.api_url);
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Get the normalized API base URL
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    fn endpoint(&self, path: &str) -> RequestResult<Url> {
        self.api_url
            .join(path)
            .map_err(|e| RequestError::InvalidUrl {
                url: format!("{}{}", self.api_url, path),
                error: e.to_string(),
            })
    }

    /// Fetches every page of a listing endpoint
    ///
    /// Pages are requested with `limit`/`offset` until a page shorter than the
    /// page size comes back.
    async fn list_paginated<T>(&self, endpoint: &str, params: &[(&str, &str)]) -> RequestResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let limit = self.page_size.to_string();
        let mut records = Vec::new();
        let mut offset = 0usize;

        loop {
            let mut url = self.endpoint(endpoint)?;
            {
                let mut query = url.query_pairs_mut();
                for (key, value) in params {
                    query.append_pair(key, value);
                }
                query
                    .append_pair("limit", &limit)
                    .append_pair("offset", &offset.to_string());
            }

            let page: Vec<T> = self
                .http_handler
                .get_json(&url, self.token.as_deref())
                .await?;
            let fetched = page.len();
            records.extend(page);

            tracing::trace!("{} page at offset {}: {} records", endpoint, offset, fetched);

            if fetched < self.page_size {
                break;
            }
            offset += fetched;
        }

        Ok(records)
    }
}

#[async_trait]
impl ArchiveClient for GirderClient {
    fn api_base(&self) -> &str {
        self.api_url.as_str()
    }

    async fn resolve_resource_id(&self, path: &str) -> ResolveResult<ResourceId> {
        let url = self.endpoint(path.trim_start_matches('/'))?;
        tracing::debug!("Resolving resource path {}", path);

        let resource: ResourceRef = self
            .http_handler
            .get_json(&url, self.token.as_deref())
            .await
            .map_err(|e| match e.status() {
                Some(404) => ResolveError::NotFound {
                    path: path.to_string(),
                },
                Some(401) | Some(403) => ResolveError::AccessDenied {
                    path: path.to_string(),
                },
                _ => ResolveError::Request(e),
            })?;

        if let Some(model_type) = &resource.model_type {
            tracing::debug!("Resolved {} to a {}", path, model_type);
        }

        resource.id.ok_or_else(|| ResolveError::MissingId {
            path: path.to_string(),
        })
    }

    async fn list_child_folders(&self, folder_id: &ResourceId) -> RequestResult<Vec<FolderRef>> {
        self.list_paginated(
            archive::FOLDER_ENDPOINT,
            &[("parentType", "folder"), ("parentId", folder_id.as_str())],
        )
        .await
    }

    async fn list_items(&self, folder_id: &ResourceId) -> RequestResult<Vec<ItemRef>> {
        self.list_paginated(archive::ITEM_ENDPOINT, &[("folderId", folder_id.as_str())])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(page_size: usize) -> ClientConfig {
        ClientConfig {
            page_size,
            retry_base_delay: Duration::from_millis(1),
            ..Default::default()
        }
    }

    fn api_url(server: &MockServer) -> Url {
        Url::parse(&format!("{}/api/v1", server.uri())).unwrap()
    }

    #[test]
    fn test_normalize_api_url() {
        let url = normalize_api_url(Url::parse("https://host/api/v1").unwrap());
        assert_eq!(url.as_str(), "https://host/api/v1/");

        let url = normalize_api_url(Url::parse("https://host/api/v1/").unwrap());
        assert_eq!(url.as_str(), "https://host/api/v1/");
    }

    #[test]
    fn test_client_creation_without_token() {
        let client =
            GirderClient::new(Url::parse("https://host/api/v1").unwrap(), &test_config(50)).unwrap();
        assert!(!client.is_authenticated());
        assert_eq!(client.api_base(), "https://host/api/v1/");
    }

    #[tokio::test]
    async fn test_token_sent_after_authentication() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/api_key/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"authToken": {"token": "tok-1"}})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/item"))
            .and(query_param("folderId", "f1"))
            .and(header("Girder-Token", "tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"_id": "i1", "name": "a.nwb", "meta": {"md5": "aaa"}}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = GirderClient::connect(api_url(&server), &test_config(50), "key")
            .await
            .unwrap();
        assert!(client.is_authenticated());

        let items = client.list_items(&ResourceId::from("f1")).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].checksum(), "aaa");
    }

    #[tokio::test]
    async fn test_list_items_paginates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/item"))
            .and(query_param("offset", "0"))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"_id": "i1", "name": "one.nwb", "meta": {}},
                {"_id": "i2", "name": "two.nwb", "meta": {}}
            ])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/item"))
            .and(query_param("offset", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"_id": "i3", "name": "three.nwb", "meta": {}}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let client = GirderClient::new(api_url(&server), &test_config(2)).unwrap();
        let items = client.list_items(&ResourceId::from("f1")).await.unwrap();

        let names: Vec<&str> = items.iter().map(|item| item.name.as_str()).collect();
        assert_eq!(names, vec!["one.nwb", "two.nwb", "three.nwb"]);
    }

    #[tokio::test]
    async fn test_exact_page_boundary_requests_empty_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/folder"))
            .and(query_param("parentType", "folder"))
            .and(query_param("parentId", "root"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"_id": "s1", "name": "sub-01"},
                {"_id": "s2", "name": "sub-02"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/folder"))
            .and(query_param("offset", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = GirderClient::new(api_url(&server), &test_config(2)).unwrap();
        let folders = client
            .list_child_folders(&ResourceId::from("root"))
            .await
            .unwrap();

        assert_eq!(folders.len(), 2);
        assert_eq!(folders[1].name.as_deref(), Some("sub-02"));
    }

    #[tokio::test]
    async fn test_resolve_resource_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/dandi/000023"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"_id": "root-folder", "_modelType": "folder"})),
            )
            .mount(&server)
            .await;

        let client = GirderClient::new(api_url(&server), &test_config(50)).unwrap();
        let id = client.resolve_resource_id("dandi/000023").await.unwrap();
        assert_eq!(id, ResourceId::from("root-folder"));
    }

    #[tokio::test]
    async fn test_resolve_unknown_dataset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/dandi/999999"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = GirderClient::new(api_url(&server), &test_config(50)).unwrap();
        let result = client.resolve_resource_id("dandi/999999").await;
        assert!(matches!(result, Err(ResolveError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_resolve_without_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/dandi/000001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "x"})))
            .mount(&server)
            .await;

        let client = GirderClient::new(api_url(&server), &test_config(50)).unwrap();
        let result = client.resolve_resource_id("dandi/000001").await;
        assert!(matches!(result, Err(ResolveError::MissingId { .. })));
    }

    #[tokio::test]
    async fn test_listing_forbidden_returns_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/folder"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = GirderClient::new(api_url(&server), &test_config(50)).unwrap();
        let result = client.list_child_folders(&ResourceId::from("root")).await;
        assert!(matches!(result, Err(RequestError::Status { status: 403, .. })));
    }
}
