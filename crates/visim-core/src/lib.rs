#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
mod secret;
mod settings;

pub use error::{BoxedError, Error, ErrorKind, Result};
pub use secret::{SecretResolver, SecretStore};
pub use settings::{
    SETTING_BLOB_CONNECTION_STRING, SETTING_FOUNDRY_API_KEY, SETTING_SEARCH_ENDPOINT,
    SETTING_SEARCH_KEY, Settings,
};

/// Tracing target for secret resolution.
pub const TRACING_TARGET_SECRET: &str = "visim_core::secret";

/// Tracing target for settings resolution.
pub const TRACING_TARGET_SETTINGS: &str = "visim_core::settings";
