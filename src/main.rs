//! # Berth API Server - Main Entry Point
//!
//! Startup order: configuration, logging, object store, HTTP server. The
//! configuration path comes from `BERTH_CONFIG_PATH`; a missing file means
//! defaults plus `BERTH_*` environment overrides.

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

use berth_apiserver::core::config::StoreBackend;
use berth_apiserver::observability::init_logging;
use berth_apiserver::{ApiServer, ApiServerConfig, Gateways, KubeStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::var("BERTH_CONFIG_PATH")
        .unwrap_or_else(|_| "config/apiserver.yaml".to_string());

    let config = ApiServerConfig::load_or_default(&config_path)
        .await
        .with_context(|| format!("failed to load configuration from {}", config_path))?;

    init_logging(&config.logging);
    info!(version = env!("CARGO_PKG_VERSION"), config = %config_path, "starting berth apiserver");

    let namespace = config.store.namespace.as_str();
    let gateways = match config.store.backend {
        StoreBackend::Kube => {
            let store = KubeStore::try_default()
                .await
                .context("failed to build kubernetes client")?;
            info!(namespace, "using cluster object store");
            Gateways::shared(Arc::new(store), namespace)
        }
        StoreBackend::Memory => {
            info!(namespace, "using in-memory object store");
            Gateways::in_memory(namespace)
        }
    };

    let server = ApiServer::new(config.server.clone(), &gateways);
    if let Err(e) = server.run().await {
        error!(error = %e, "apiserver exited with error");
        return Err(e);
    }

    Ok(())
}
