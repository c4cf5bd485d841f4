//! Client for the hosted crawl API
//!
//! Every endpoint is a JSON POST authenticated with the `X-API-Key` header.
//! Anything but a 200 answer is an error.

use crate::WebtError;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// Base URL of the hosted API
pub const DEFAULT_API_URL: &str = "https://api.webtranspose.com/";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "WEBTRANSPOSE_API_KEY";

/// Timeout for one API call
const API_TIMEOUT: Duration = Duration::from_secs(180);

/// Reads the API key from the environment, treating an empty value as unset
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV).ok().filter(|key| !key.trim().is_empty())
}

/// Authenticated client for the hosted API
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl ApiClient {
    /// Creates a client for the default API endpoint
    pub fn new(api_key: impl Into<String>) -> Result<Self, WebtError> {
        Self::with_base_url(api_key, DEFAULT_API_URL)
    }

    /// Creates a client for another endpoint
    pub fn with_base_url(api_key: impl Into<String>, base_url: &str) -> Result<Self, WebtError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| crate::ConfigError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        let client = Client::builder().timeout(API_TIMEOUT).build()?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
        })
    }

    /// Posts `body` to `path` and decodes the JSON answer
    ///
    /// # Errors
    ///
    /// * `WebtError::Api` - the API answered with a non-200 status
    /// * `WebtError::Http` - the request could not be sent or the body not decoded
    pub async fn call<B, T>(&self, path: &str, body: &B) -> Result<T, WebtError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let endpoint = self.base_url.join(path).map_err(|e| WebtError::ApiResponse {
            path: path.to_string(),
            message: e.to_string(),
        })?;

        tracing::debug!("POST {}", endpoint);
        let response = self
            .client
            .post(endpoint.clone())
            .header("X-API-Key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|source| WebtError::Http {
                url: endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(WebtError::Api {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        response.json().await.map_err(|source| WebtError::Http {
            url: endpoint.to_string(),
            source,
        })
    }

    /// Downloads raw bytes from a URL returned by the API
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, WebtError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|source| WebtError::Http {
                url: url.to_string(),
                source,
            })?;

        let bytes = response.bytes().await.map_err(|source| WebtError::Http {
            url: url.to_string(),
            source,
        })?;
        Ok(bytes.to_vec())
    }
}
