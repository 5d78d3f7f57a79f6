//! API key authentication
//!
//! The archive exchanges a long-lived API key for a session token
//! (`POST api_key/token?key=...`). The token is then sent on every request in
//! the `Girder-Token` header.

use serde::Deserialize;
use url::Url;

use crate::app::client::http::HttpHandler;
use crate::constants::archive;
use crate::errors::{AuthError, AuthResult, RequestError};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(rename = "authToken")]
    auth_token: Option<AuthToken>,
}

#[derive(Debug, Deserialize)]
struct AuthToken {
    token: Option<String>,
    #[serde(default)]
    expires: Option<String>,
}

/// Handles API key authentication
pub struct AuthHandler;

impl AuthHandler {
    /// Exchanges an API key for a session token
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if:
    /// - The key is empty
    /// - The archive rejects the key (HTTP 400/401/403)
    /// - The response does not carry a token
    /// - The request fails after retries
    pub async fn exchange_api_key(
        http: &HttpHandler,
        api_url: &Url,
        api_key: &str,
    ) -> AuthResult<String> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(AuthError::MissingApiKey);
        }

        let mut url = api_url
            .join(archive::TOKEN_ENDPOINT)
            .map_err(|e| RequestError::InvalidUrl {
                url: format!("{}{}", api_url, archive::TOKEN_ENDPOINT),
                error: e.to_string(),
            })?;
        url.query_pairs_mut().append_pair("key", api_key);

        tracing::info!("Requesting session token from {}", api_url);

        let response: TokenResponse = http.post_json(&url).await.map_err(|e| match e {
            RequestError::Status { status, .. } if matches!(status, 400 | 401 | 403) => {
                tracing::warn!("API key rejected by archive (HTTP {})", status);
                AuthError::Rejected { status }
            }
            other => AuthError::Request(other),
        })?;

        let auth_token = response.auth_token.ok_or_else(|| AuthError::MalformedToken {
            reason: "missing 'authToken' object".to_string(),
        })?;

        let token = auth_token
            .token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AuthError::MalformedToken {
                reason: "missing 'authToken.token' value".to_string(),
            })?;

        if let Some(expires) = auth_token.expires {
            tracing::debug!("Session token expires at {}", expires);
        }

        Ok(token)
    }
}
