//! Core HTTP operations with rate limiting and retry logic
//!
//! Every archive request goes through [`HttpHandler`], which applies the
//! client-wide rate limit and retries throttled (429), overloaded (503) and
//! transport-failed requests with exponential backoff. Other error statuses
//! are returned immediately.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::app::client::config::ClientConfig;
use crate::constants::archive;
use crate::errors::{AuthError, AuthResult, RequestError, RequestResult};

type DirectRateLimiter = RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>;

/// HTTP operations handler with resilience patterns
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: DirectRateLimiter,
    max_retries: u32,
    retry_base_delay: Duration,
}

impl HttpHandler {
    /// Creates a new HttpHandler from the client configuration
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if the HTTP client or rate limiter cannot be built
    pub fn new(config: &ClientConfig) -> AuthResult<Self> {
        let client = config.build_http_client()?;
        let rate_limiter = Self::build_rate_limiter(config.rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay,
        })
    }

    fn build_rate_limiter(rate_limit_rps: u32) -> AuthResult<DirectRateLimiter> {
        let rps = NonZeroU32::new(rate_limit_rps).ok_or_else(|| AuthError::InvalidClientConfig {
            reason: "Rate limit must be non-zero".to_string(),
        })?;
        Ok(RateLimiter::direct(Quota::per_second(rps)))
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        self.retry_base_delay * 2_u32.saturating_pow(attempt)
    }

    /// Sends a request with rate limiting and retry logic
    ///
    /// `build` is called once per attempt to produce a fresh request. Errors
    /// and log lines carry the URL without its query string, which may hold
    /// the API key.
    pub async fn send<F>(&self, url: &Url, build: F) -> RequestResult<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let display_url = redact_query(url);
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
            .await;

        let mut retries = 0;
        loop {
            match build(&self.client).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::TOO_MANY_REQUESTS
                        || status == StatusCode::SERVICE_UNAVAILABLE
                    {
                        if retries < self.max_retries {
                            retries += 1;
                            let delay = self.backoff_delay(retries);
                            tracing::warn!(
                                "Server responded {} for {}. Backing off for {}ms",
                                status.as_u16(),
                                display_url,
                                delay.as_millis()
                            );
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        return Err(if status == StatusCode::TOO_MANY_REQUESTS {
                            RequestError::RateLimitExceeded
                        } else {
                            RequestError::ServerOverloaded
                        });
                    }

                    if !status.is_success() {
                        return Err(RequestError::Status {
                            status: status.as_u16(),
                            url: display_url,
                        });
                    }

                    tracing::debug!("Successfully fetched response: {}", display_url);
                    return Ok(response);
                }
                Err(e) if retries < self.max_retries => {
                    retries += 1;
                    let delay = self.backoff_delay(retries);
                    tracing::warn!(
                        "Request failed (attempt {}/{}): {}. Retrying in {}ms",
                        retries,
                        self.max_retries,
                        e.without_url(),
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        "Request failed after {} retries: {}",
                        self.max_retries,
                        e.without_url()
                    );
                    return Err(RequestError::MaxRetriesExceeded {
                        max_retries: self.max_retries,
                        url: display_url,
                    });
                }
            }
        }
    }

    /// GET a JSON document, sending the session token when one is given
    pub async fn get_json<T>(&self, url: &Url, token: Option<&str>) -> RequestResult<T>
    where
        T: DeserializeOwned,
    {
        let response = self
            .send(url, |client| {
                let request = client.get(url.as_str());
                match token {
                    Some(token) => request.header(archive::TOKEN_HEADER, token),
                    None => request,
                }
            })
            .await?;
        Self::decode(response, url).await
    }

    /// POST without a body and decode the JSON response
    pub async fn post_json<T>(&self, url: &Url) -> RequestResult<T>
    where
        T: DeserializeOwned,
    {
        let response = self.send(url, |client| client.post(url.as_str())).await?;
        Self::decode(response, url).await
    }

    async fn decode<T>(response: Response, url: &Url) -> RequestResult<T>
    where
        T: DeserializeOwned,
    {
        let body = response
            .text()
            .await
            .map_err(|e| RequestError::Http(e.without_url()))?;
        serde_json::from_str(&body).map_err(|e| RequestError::InvalidResponse {
            url: redact_query(url),
            reason: e.to_string(),
        })
    }
}

/// URL without its query string, for messages that may otherwise leak keys
pub(crate) fn redact_query(url: &Url) -> String {
    let mut redacted = url.clone();
    redacted.set_query(None);
    redacted.to_string()
}
