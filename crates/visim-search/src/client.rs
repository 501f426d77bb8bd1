//! Thin REST client for the managed search service.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;
use visim_core::Settings;

use crate::error::{Result, SearchError};
use crate::TRACING_TARGET;

/// API version sent with every request.
pub const API_VERSION: &str = "2024-05-01-preview";

/// Default timeout for service requests: 30 seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for the search service client.
#[derive(Debug, Clone)]
pub struct SearchClientConfig {
    /// Service endpoint, e.g. `https://my-search.search.example.net`.
    pub endpoint: Url,
    /// Admin or query API key.
    pub api_key: String,
    /// Timeout applied to every request.
    pub timeout: Duration,
}

impl SearchClientConfig {
    /// Creates a new configuration.
    pub fn new(endpoint: Url, api_key: impl Into<String>) -> Self {
        Self {
            endpoint,
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Builds a configuration from resolved application settings.
    ///
    /// # Errors
    ///
    /// Fails when the search endpoint setting is empty or not a valid URL.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        if settings.search_endpoint.is_empty() {
            return Err(SearchError::invalid_config(
                "search endpoint is unconfigured",
            ));
        }

        let endpoint = Url::parse(&settings.search_endpoint)
            .map_err(|e| SearchError::invalid_config(format!("invalid search endpoint: {e}")))?;

        Ok(Self::new(endpoint, settings.search_key.clone()))
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

struct SearchClientInner {
    http: Client,
    config: SearchClientConfig,
}

/// REST client for the managed search service.
///
/// Authenticates with the `api-key` header and pins a single API version.
/// Non-success responses become [`SearchError::Service`] carrying the
/// service's own error body; no retries are attempted.
#[derive(Clone)]
pub struct SearchClient {
    inner: Arc<SearchClientInner>,
}

impl SearchClient {
    /// Creates a new client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be created.
    pub fn new(config: SearchClientConfig) -> Result<Self> {
        tracing::debug!(
            target: TRACING_TARGET,
            endpoint = %config.endpoint,
            timeout_ms = config.timeout.as_millis(),
            "Creating search client"
        );

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("visim/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(SearchClientInner { http, config }),
        })
    }

    /// Issues `PUT {endpoint}/{segments}` with a JSON body.
    ///
    /// The service treats PUT by name as create-or-update, which makes every
    /// provisioning call idempotent.
    pub async fn put_json<B>(&self, segments: &[&str], body: &B) -> Result<serde_json::Value>
    where
        B: Serialize + ?Sized,
    {
        self.request(Method::PUT, segments, Some(body)).await
    }

    /// Issues `GET {endpoint}/{segments}`.
    ///
    /// A 404 from the service becomes [`SearchError::NotFound`] so callers
    /// can distinguish absence from other failures.
    pub async fn get_json(&self, segments: &[&str]) -> Result<serde_json::Value> {
        self.request::<()>(Method::GET, segments, None).await
    }

    /// Issues `POST {endpoint}/{segments}` with a JSON body and decodes the
    /// response.
    pub async fn post_json<B, R>(&self, segments: &[&str], body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let value = self.request(Method::POST, segments, Some(body)).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn request<B>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<serde_json::Value>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(segments)?;

        let mut request = self
            .inner
            .http
            .request(method.clone(), url)
            .header("api-key", &self.inner.config.api_key);

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(SearchError::not_found(segments.join("/")));
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(
                target: TRACING_TARGET,
                method = %method,
                path = %segments.join("/"),
                status = status.as_u16(),
                "Service call failed"
            );
            return Err(SearchError::service(status.as_u16(), message));
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(serde_json::Value::Null);
        }

        Ok(response.json().await?)
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.inner.config.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| SearchError::invalid_config("endpoint cannot be a base URL"))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        Ok(url)
    }
}

impl std::fmt::Debug for SearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchClient")
            .field("endpoint", &self.inner.config.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_settings_rejects_empty_endpoint() {
        let settings = Settings {
            foundry_api_key: String::new(),
            search_endpoint: String::new(),
            search_key: "key".into(),
            blob_connection_string: String::new(),
        };

        let error = SearchClientConfig::from_settings(&settings).unwrap_err();
        assert!(matches!(error, SearchError::InvalidConfig(_)));
    }

    #[test]
    fn url_carries_api_version() {
        let config = SearchClientConfig::new(
            Url::parse("https://search.example.net").unwrap(),
            "key",
        );
        let client = SearchClient::new(config).unwrap();

        let url = client.url(&["indexes", "demo-index"]).unwrap();
        assert_eq!(url.path(), "/indexes/demo-index");
        assert_eq!(url.query(), Some(format!("api-version={API_VERSION}").as_str()));
    }
}
