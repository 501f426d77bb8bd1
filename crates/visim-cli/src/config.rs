//! CLI configuration management.
//!
//! All options can be provided via CLI arguments or environment variables;
//! a `.env` file is loaded before parsing so its values act as defaults.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use url::Url;

use crate::TRACING_TARGET_CONFIG;

/// Complete CLI configuration.
#[derive(Debug, Parser)]
#[command(name = "visim")]
#[command(about = "Image similarity search backend")]
#[command(version)]
pub struct Cli {
    /// Server network configuration.
    #[clap(flatten)]
    pub server: ServerConfig,

    /// Secret store configuration.
    #[clap(flatten)]
    pub vault: VaultArgs,

    /// Search service configuration.
    #[clap(flatten)]
    pub search: SearchArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Loads environment variables from a `.env` file and parses arguments.
    pub fn init() -> Self {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }

        Self::parse()
    }

    /// Initializes tracing with environment-based filtering.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.server.validate()?;
        self.search.validate()?;
        Ok(())
    }

    /// Logs configuration at startup (no sensitive information).
    pub fn log(&self) {
        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            host = %self.server.host,
            port = self.server.port,
            base_name = %self.search.base_name,
            default_image = %self.search.default_image.display(),
            neighbors = self.search.neighbors,
            top = self.search.top,
            vault_configured = self.vault.vault_uri.is_some(),
            "Configuration loaded"
        );
    }
}

/// Available commands; the server is the default.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the HTTP server.
    Serve,
    /// Provision the index and ingestion pipeline on the managed service.
    ///
    /// Runs index, data source, skillset, and indexer creation in order.
    /// Safe to re-run: every step is a create-or-update by name.
    Provision {
        /// Blob container holding the source images.
        #[arg(long, env = "BLOB_CONTAINER")]
        container: String,

        /// Virtual folder within the container to ingest from.
        #[arg(long, env = "BLOB_FOLDER")]
        folder: Option<String>,
    },
}

/// HTTP server configuration.
#[derive(Debug, Clone, Args)]
#[must_use = "config does nothing unless you use it"]
pub struct ServerConfig {
    /// Host address to bind the server to.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// TCP port number for the server to listen on.
    #[arg(short = 'p', long, env = "PORT", default_value_t = 3000)]
    pub port: u16,
}

impl ServerConfig {
    /// Returns the socket address to bind to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Validates the network configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.port < 1024 {
            return Err(anyhow!("port {} requires elevated privileges", self.port));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
        }
    }
}

/// Secret store configuration.
///
/// When no vault URI is configured, settings resolve from the environment
/// alone.
#[derive(Debug, Clone, Args)]
pub struct VaultArgs {
    /// Base URI of the key vault holding the application secrets.
    #[arg(long, env = "KEYVAULTURI")]
    pub vault_uri: Option<Url>,

    /// Bearer token used to authenticate vault reads.
    #[arg(long, env = "KEYVAULT_TOKEN", hide_env_values = true)]
    pub vault_token: Option<String>,
}

/// Search service configuration.
#[derive(Debug, Clone, Args)]
pub struct SearchArgs {
    /// Base name all provisioned resources derive from.
    #[arg(long, env = "SEARCH_BASE_NAME", default_value = "design-helper")]
    pub base_name: String,

    /// Resource URI of the hosted vision vectorizer.
    #[arg(
        long,
        env = "VISION_RESOURCE_URI",
        default_value = "https://design-helper-foundry.cognitiveservices.azure.com/"
    )]
    pub vision_resource_uri: String,

    /// Image searched by `GET /` when the caller supplies none.
    #[arg(long, env = "DEFAULT_IMAGE_PATH", default_value = "testimg.png")]
    pub default_image: PathBuf,

    /// Nearest neighbors requested per vector query.
    #[arg(long, env = "K_NEAREST_NEIGHBORS", default_value_t = 2)]
    pub neighbors: u32,

    /// Result-set bound forwarded to the service.
    #[arg(long, env = "SEARCH_TOP", default_value_t = 10)]
    pub top: u32,
}

impl SearchArgs {
    /// Returns the name of the search index.
    pub fn index_name(&self) -> String {
        format!("{}-index", self.base_name)
    }

    /// Validates the search configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_name.is_empty() {
            return Err(anyhow!("base name must not be empty"));
        }
        if self.neighbors == 0 {
            return Err(anyhow!("nearest-neighbor count must be at least 1"));
        }
        Ok(())
    }
}
