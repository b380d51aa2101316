//! HTTP client for the geocoding/places provider
//!
//! This module handles:
//! - Building the `reqwest` client with user agent and timeouts
//! - Authenticated GET requests against the provider's JSON endpoints
//! - Classifying HTTP and envelope statuses into [`HarvestError`] variants
//! - Wrapping every call in the bounded retry policy

use crate::config::{ClientConfig, Config};
use crate::crawler::retry::{retry_with_backoff, RetryPolicy};
use crate::crawler::types::{ApiEnvelope, ApiStatus};
use crate::HarvestError;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// Geocoding endpoint, relative to the places base URL
pub const GEOCODE_ENDPOINT: &str = "geocode/json";
/// Nearby-search endpoint
pub const NEARBY_SEARCH_ENDPOINT: &str = "place/nearbysearch/json";
/// Place-details endpoint
pub const DETAILS_ENDPOINT: &str = "place/details/json";

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use placecrawl::config::ClientConfig;
/// use placecrawl::crawler::build_http_client;
///
/// let config = ClientConfig {
///     user_agent: "placecrawl/0.1".to_string(),
///     timeout_secs: 30,
///     connect_timeout_secs: 10,
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &ClientConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Authenticated client for the places provider, shared by the resolver,
/// pager and detail fetcher
pub struct PlacesClient {
    http: Client,
    api_key: String,
    base_url: Url,
    retry: RetryPolicy,
}

impl PlacesClient {
    /// Creates a client from configuration and an already-resolved API key
    pub fn new(config: &Config, api_key: &str) -> Result<Self, HarvestError> {
        let http = build_http_client(&config.client)?;
        let retry = RetryPolicy {
            max_retries: config.crawler.max_retries,
            backoff_base_ms: config.crawler.backoff_base_ms,
        };
        Self::with_http_client(http, api_key, &config.api.places_base_url, retry)
    }

    /// Creates a client around an existing `reqwest::Client`
    pub fn with_http_client(
        http: Client,
        api_key: &str,
        base_url: &str,
        retry: RetryPolicy,
    ) -> Result<Self, HarvestError> {
        // A single trailing slash makes `join` append rather than replace the last segment.
        let base_url = Url::parse(&format!("{}/", base_url.trim_end_matches('/')))?;

        Ok(Self {
            http,
            api_key: api_key.to_string(),
            base_url,
            retry,
        })
    }

    /// Issues a GET against `endpoint` and decodes the typed envelope
    ///
    /// Returns the envelope for `OK`, `ZERO_RESULTS` and `NOT_FOUND`; callers decide
    /// what an empty result means for them. Every other status becomes an error.
    pub async fn get<T>(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<T, HarvestError>
    where
        T: DeserializeOwned + ApiEnvelope,
    {
        let url = self.base_url.join(endpoint)?;
        let url = &url;
        retry_with_backoff(self.retry, move || self.get_once(url, endpoint, params)).await
    }

    async fn get_once<T>(
        &self,
        url: &Url,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T, HarvestError>
    where
        T: DeserializeOwned + ApiEnvelope,
    {
        tracing::trace!("GET {}", endpoint);

        let response = self
            .http
            .get(url.clone())
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|source| HarvestError::Http {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(HarvestError::QuotaExhausted {
                endpoint: endpoint.to_string(),
            });
        }
        if !status.is_success() {
            return Err(HarvestError::Upstream {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| HarvestError::Http {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let envelope: T = serde_json::from_str(&body).map_err(|source| HarvestError::Decode {
            context: endpoint.to_string(),
            source,
        })?;

        check_status(endpoint, &envelope)?;
        Ok(envelope)
    }
}

/// Maps a non-success envelope status onto the error taxonomy
fn check_status<T: ApiEnvelope>(endpoint: &str, envelope: &T) -> Result<(), HarvestError> {
    match envelope.status() {
        ApiStatus::Ok | ApiStatus::ZeroResults | ApiStatus::NotFound => Ok(()),
        ApiStatus::OverQueryLimit => Err(HarvestError::QuotaExhausted {
            endpoint: endpoint.to_string(),
        }),
        other => Err(HarvestError::ApiStatus {
            endpoint: endpoint.to_string(),
            status: other.clone(),
            message: envelope
                .error_message()
                .unwrap_or("no error message")
                .to_string(),
        }),
    }
}
