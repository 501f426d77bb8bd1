//! Secret resolution with environment fallback.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::TRACING_TARGET_SECRET;

/// A named secret store, such as a hosted key vault.
///
/// Implementations live outside this crate (see `visim-vault`); tests inject
/// in-memory or failing stores through this seam.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetches the value of a named secret.
    async fn get_secret(&self, name: &str) -> Result<String>;
}

/// Resolves named configuration values from a secret store, falling back to
/// environment variables of the same name.
///
/// Resolution never fails: when neither source yields a value the resolver
/// logs a warning and returns an empty string. Callers treat an empty value
/// as "unconfigured".
#[derive(Clone)]
pub struct SecretResolver {
    store: Option<Arc<dyn SecretStore>>,
}

impl SecretResolver {
    /// Creates a resolver without a secret store; only the environment is
    /// consulted.
    pub fn new() -> Self {
        Self { store: None }
    }

    /// Creates a resolver backed by the given secret store.
    pub fn with_store(store: Arc<dyn SecretStore>) -> Self {
        Self { store: Some(store) }
    }

    /// Resolves a named value.
    ///
    /// Tries the secret store first when one is configured; any store failure
    /// is logged at warn level and resolution falls through to the
    /// environment. Dashed names also try their underscore form, since
    /// environment conventions differ between the two.
    pub async fn resolve(&self, name: &str) -> String {
        if let Some(store) = &self.store {
            match store.get_secret(name).await {
                Ok(value) => return value,
                Err(error) => {
                    tracing::warn!(
                        target: TRACING_TARGET_SECRET,
                        secret = %name,
                        error = %error,
                        "Could not fetch secret from store, falling back to environment"
                    );
                }
            }
        }

        if let Some(value) = Self::from_env(name) {
            return value;
        }

        tracing::warn!(
            target: TRACING_TARGET_SECRET,
            secret = %name,
            "Could not find value in secret store or environment"
        );

        String::new()
    }

    /// Reads a value from the environment, trying the name verbatim and then
    /// with dashes replaced by underscores.
    fn from_env(name: &str) -> Option<String> {
        if let Ok(value) = std::env::var(name) {
            return Some(value);
        }

        if name.contains('-') {
            let underscored = name.replace('-', "_");
            if let Ok(value) = std::env::var(&underscored) {
                return Some(value);
            }
        }

        None
    }
}

impl Default for SecretResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SecretResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretResolver")
            .field("has_store", &self.store.is_some())
            .finish()
    }
}
