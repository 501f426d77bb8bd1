//! Application settings resolved once at process start.

use serde::{Deserialize, Serialize};

use crate::secret::SecretResolver;
use crate::TRACING_TARGET_SETTINGS;

/// Setting name for the vision service API key.
pub const SETTING_FOUNDRY_API_KEY: &str = "AZURE-FOUNDRY-API-KEY";

/// Setting name for the search service endpoint.
pub const SETTING_SEARCH_ENDPOINT: &str = "AI-SEARCH-ENDPOINT";

/// Setting name for the search service API key.
pub const SETTING_SEARCH_KEY: &str = "AI-SEARCH-KEY";

/// Setting name for the blob storage connection string.
pub const SETTING_BLOB_CONNECTION_STRING: &str = "AZURE-BLOB-STORAGE-CONNECTION-STRING";

/// Immutable application settings.
///
/// Resolved once at startup through a [`SecretResolver`] and passed by
/// reference (or `Arc`) to every component that needs them. Empty values mean
/// the setting is unconfigured; resolution itself never fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// API key for the hosted vision/vectorizer service.
    pub foundry_api_key: String,
    /// Endpoint URL of the managed search service.
    pub search_endpoint: String,
    /// API key for the managed search service.
    pub search_key: String,
    /// Connection string for the source blob storage account.
    pub blob_connection_string: String,
}

impl Settings {
    /// Resolves all settings through the given resolver.
    pub async fn resolve(resolver: &SecretResolver) -> Self {
        let settings = Self {
            foundry_api_key: resolver.resolve(SETTING_FOUNDRY_API_KEY).await,
            search_endpoint: resolver.resolve(SETTING_SEARCH_ENDPOINT).await,
            search_key: resolver.resolve(SETTING_SEARCH_KEY).await,
            blob_connection_string: resolver.resolve(SETTING_BLOB_CONNECTION_STRING).await,
        };

        settings.log();
        settings
    }

    /// Returns the names of all settings that resolved to an empty value.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            (SETTING_FOUNDRY_API_KEY, self.foundry_api_key.is_empty()),
            (SETTING_SEARCH_ENDPOINT, self.search_endpoint.is_empty()),
            (SETTING_SEARCH_KEY, self.search_key.is_empty()),
            (
                SETTING_BLOB_CONNECTION_STRING,
                self.blob_connection_string.is_empty(),
            ),
        ]
        .into_iter()
        .filter_map(|(name, empty)| empty.then_some(name))
        .collect()
    }

    /// Logs the resolution outcome without leaking secret values.
    fn log(&self) {
        let missing = self.missing();

        if missing.is_empty() {
            tracing::info!(
                target: TRACING_TARGET_SETTINGS,
                "All settings resolved"
            );
        } else {
            tracing::warn!(
                target: TRACING_TARGET_SETTINGS,
                missing = ?missing,
                "Some settings are unconfigured; dependent service calls will fail"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::secret::SecretStore;

    /// Store holding only the search pair; everything else resolves empty.
    ///
    /// Returning `Ok` for unknown names keeps resolution inside the store, so
    /// the test does not depend on the process environment.
    struct PartialStore;

    #[async_trait]
    impl SecretStore for PartialStore {
        async fn get_secret(&self, name: &str) -> crate::Result<String> {
            Ok(match name {
                SETTING_SEARCH_ENDPOINT => "https://search.example.net".to_owned(),
                SETTING_SEARCH_KEY => "query-key".to_owned(),
                _ => String::new(),
            })
        }
    }

    #[tokio::test]
    async fn unresolved_settings_are_reported_missing() {
        let resolver = SecretResolver::with_store(Arc::new(PartialStore));
        let settings = Settings::resolve(&resolver).await;

        assert_eq!(settings.search_endpoint, "https://search.example.net");
        assert_eq!(
            settings.missing(),
            [SETTING_FOUNDRY_API_KEY, SETTING_BLOB_CONNECTION_STRING]
        );
    }

    #[test]
    fn fully_populated_settings_report_nothing_missing() {
        let settings = Settings {
            foundry_api_key: "key".into(),
            search_endpoint: "https://search.example.net".into(),
            search_key: "key".into(),
            blob_connection_string: "DefaultEndpointsProtocol=https;...".into(),
        };

        assert!(settings.missing().is_empty());
    }
}
