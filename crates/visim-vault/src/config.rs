//! Vault client configuration.

use std::time::Duration;

use url::Url;

/// Default timeout for vault requests: 10 seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// API version sent with every secret request.
pub const API_VERSION: &str = "7.4";

/// Configuration for the vault client.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Base URI of the vault, e.g. `https://my-vault.vault.example.net`.
    pub vault_uri: Url,
    /// Bearer token used to authenticate secret reads.
    pub token: String,
    /// Timeout applied to every request.
    pub timeout: Duration,
}

impl VaultConfig {
    /// Creates a new configuration for the given vault URI and token.
    pub fn new(vault_uri: Url, token: impl Into<String>) -> Self {
        Self {
            vault_uri,
            token: token.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let uri = Url::parse("https://vault.example.net").unwrap();
        let config = VaultConfig::new(uri, "token");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }
}
