//! Vault client implementation using reqwest.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use visim_core::SecretStore;

use crate::config::{API_VERSION, VaultConfig};
use crate::error::{Error, Result};
use crate::TRACING_TARGET;

/// Wire shape of a secret read.
#[derive(Debug, Deserialize)]
struct SecretBundle {
    value: String,
}

/// Inner client that holds the HTTP client and configuration.
struct VaultClientInner {
    http: Client,
    config: VaultConfig,
}

impl std::fmt::Debug for VaultClientInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultClientInner")
            .field("vault_uri", &self.config.vault_uri.as_str())
            .finish_non_exhaustive()
    }
}

/// Client for reading named secrets from a hosted key vault.
///
/// Implements [`SecretStore`] so the resolver in `visim-core` can consult it
/// before falling back to the environment. The client is cheap to clone and
/// is dropped when its owning scope ends; no finalizers are involved.
#[derive(Clone, Debug)]
pub struct VaultClient {
    inner: Arc<VaultClientInner>,
}

impl VaultClient {
    /// Creates a new vault client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be created.
    pub fn new(config: VaultConfig) -> Result<Self> {
        tracing::debug!(
            target: TRACING_TARGET,
            vault_uri = %config.vault_uri,
            timeout_ms = config.timeout.as_millis(),
            "Creating vault client"
        );

        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("visim/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(VaultClientInner { http, config }),
        })
    }

    /// Fetches one secret by name.
    async fn fetch(&self, name: &str) -> Result<String> {
        let mut url = self.inner.config.vault_uri.clone();
        url.path_segments_mut()
            .map_err(|()| Error::SecretNotFound(name.to_owned()))?
            .pop_if_empty()
            .extend(["secrets", name]);
        url.query_pairs_mut().append_pair("api-version", API_VERSION);

        let response = self
            .inner
            .http
            .get(url)
            .bearer_auth(&self.inner.config.token)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(Error::SecretNotFound(name.to_owned())),
            status if !status.is_success() => {
                let message = response.text().await.unwrap_or_default();
                Err(Error::Status {
                    status: status.as_u16(),
                    message,
                })
            }
            _ => {
                let bundle: SecretBundle = response.json().await?;
                Ok(bundle.value)
            }
        }
    }
}

#[async_trait]
impl SecretStore for VaultClient {
    async fn get_secret(&self, name: &str) -> visim_core::Result<String> {
        tracing::debug!(
            target: TRACING_TARGET,
            secret = %name,
            "Fetching secret"
        );

        self.fetch(name).await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use url::Url;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client_for(server: &MockServer) -> VaultClient {
        let uri = Url::parse(&server.uri()).unwrap();
        VaultClient::new(VaultConfig::new(uri, "test-token")).unwrap()
    }

    #[tokio::test]
    async fn fetches_secret_value() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/secrets/AI-SEARCH-KEY"))
            .and(query_param("api-version", API_VERSION))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"value": "s3cret"})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let value = client.get_secret("AI-SEARCH-KEY").await.unwrap();
        assert_eq!(value, "s3cret");
    }

    #[tokio::test]
    async fn missing_secret_maps_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let error = client.get_secret("NO-SUCH-SECRET").await.unwrap_err();
        assert_eq!(error.kind(), visim_core::ErrorKind::NotFound);
    }
}
