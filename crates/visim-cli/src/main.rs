#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;

use std::process;
use std::sync::Arc;

use anyhow::Context;
use visim_core::{SecretResolver, Settings};
use visim_search::{
    Provisioner, QueryService, ResourceNames, SearchClient, SearchClientConfig, VisionSettings,
};
use visim_server::{AppState, QueryOptions};
use visim_vault::{VaultClient, VaultConfig};

use crate::config::{Cli, Command, SearchArgs};

/// Tracing target for server startup.
pub const TRACING_TARGET_STARTUP: &str = "visim_cli::startup";

/// Tracing target for server shutdown.
pub const TRACING_TARGET_SHUTDOWN: &str = "visim_cli::shutdown";

/// Tracing target for configuration.
pub const TRACING_TARGET_CONFIG: &str = "visim_cli::config";

/// Tracing target for provisioning.
pub const TRACING_TARGET_PROVISION: &str = "visim_cli::provision";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %error,
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    Cli::init_tracing();
    cli.validate().context("invalid configuration")?;
    cli.log();

    let settings = resolve_settings(&cli.vault).await;

    match cli.command.clone().unwrap_or(Command::Serve) {
        Command::Serve => serve(&cli, &settings).await,
        Command::Provision { container, folder } => {
            provision(&cli.search, &settings, &container, folder.as_deref()).await
        }
    }
}

/// Resolves application settings, consulting the vault when one is
/// configured.
///
/// The vault client lives only within this function; it is dropped as soon
/// as resolution finishes.
async fn resolve_settings(vault: &config::VaultArgs) -> Settings {
    let resolver = match &vault.vault_uri {
        Some(uri) => {
            let config = VaultConfig::new(
                uri.clone(),
                vault.vault_token.clone().unwrap_or_default(),
            );
            match VaultClient::new(config) {
                Ok(client) => {
                    tracing::info!(
                        target: TRACING_TARGET_STARTUP,
                        vault_uri = %uri,
                        "Vault client created"
                    );
                    SecretResolver::with_store(Arc::new(client))
                }
                Err(error) => {
                    tracing::warn!(
                        target: TRACING_TARGET_STARTUP,
                        error = %error,
                        "Could not create vault client, falling back to environment"
                    );
                    SecretResolver::new()
                }
            }
        }
        None => SecretResolver::new(),
    };

    Settings::resolve(&resolver).await
}

/// Runs the HTTP server until interrupted.
async fn serve(cli: &Cli, settings: &Settings) -> anyhow::Result<()> {
    let client_config =
        SearchClientConfig::from_settings(settings).context("invalid search settings")?;
    let client = SearchClient::new(client_config).context("failed to create search client")?;
    let query = QueryService::new(client, cli.search.index_name());

    let options = QueryOptions::new(&cli.search.default_image)
        .with_neighbors(cli.search.neighbors)
        .with_top(cli.search.top);
    let router = visim_server::routes(AppState::new(query, options))
        .layer(tower_http::trace::TraceLayer::new_for_http());

    let addr = cli.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        target: TRACING_TARGET_STARTUP,
        version = env!("CARGO_PKG_VERSION"),
        %addr,
        "Server listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

/// Provisions the index and ingestion pipeline, in order.
async fn provision(
    search: &SearchArgs,
    settings: &Settings,
    container: &str,
    folder: Option<&str>,
) -> anyhow::Result<()> {
    let client_config =
        SearchClientConfig::from_settings(settings).context("invalid search settings")?;
    let client = SearchClient::new(client_config).context("failed to create search client")?;

    let vision = VisionSettings::new(&search.vision_resource_uri, &settings.foundry_api_key);
    let mut provisioner = Provisioner::new(
        client,
        ResourceNames::new(&search.base_name),
        vision,
        &settings.blob_connection_string,
    );

    provisioner
        .create_index()
        .await
        .context("failed to create index")?;
    provisioner
        .create_data_source(container, folder)
        .await
        .context("failed to create data source")?;
    provisioner
        .create_skillset()
        .await
        .context("failed to create skillset")?;
    provisioner
        .create_indexer()
        .await
        .context("failed to create indexer")?;

    tracing::info!(
        target: TRACING_TARGET_PROVISION,
        base_name = %search.base_name,
        container = %container,
        "Provisioning complete; ingestion runs asynchronously on the service"
    );

    Ok(())
}

/// Completes when the process receives an interrupt signal.
async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            target: TRACING_TARGET_SHUTDOWN,
            error = %error,
            "Failed to install interrupt handler"
        );
        return;
    }

    tracing::info!(
        target: TRACING_TARGET_SHUTDOWN,
        "Interrupt received, shutting down"
    );
}
