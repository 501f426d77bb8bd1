#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod client;
mod config;
mod error;

pub use client::VaultClient;
pub use config::VaultConfig;
pub use error::{Error, Result};

/// Tracing target for vault operations.
pub const TRACING_TARGET: &str = "visim_vault";
