//! # HTTP Server Module
//!
//! Maps the REST surface onto the per-kind gateways. Every kind gets the
//! same five routes under the configured prefix:
//!
//! - `GET  /{plural}` and `/{plural}/` list
//! - `POST /{plural}` and `/{plural}/` create
//! - `GET | PUT | DELETE /{plural}/:name`
//!
//! Handlers are generic over [`ResourceKind`]; the router is assembled once
//! per kind with that kind's gateway as state and then merged.

use std::net::SocketAddr;
use std::time::Duration;

use axum::error_handling::HandleErrorLayer;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{BoxError, Json, Router};
use serde_json::json;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::{Gateway, Gateways, ResourceKind};
use crate::core::config::ServerConfig;
use crate::core::error::{GatewayError, GatewayResult};

async fn list_resources<K: ResourceKind>(
    State(gateway): State<Gateway<K>>,
) -> GatewayResult<Json<Vec<K::View>>> {
    Ok(Json(gateway.list().await?))
}

async fn get_resource<K: ResourceKind>(
    State(gateway): State<Gateway<K>>,
    Path(name): Path<String>,
) -> GatewayResult<Json<K::View>> {
    Ok(Json(gateway.get(&name).await?))
}

async fn create_resource<K: ResourceKind>(
    State(gateway): State<Gateway<K>>,
    body: Result<Json<K::Request>, JsonRejection>,
) -> GatewayResult<(StatusCode, Json<K::View>)> {
    let Json(request) = body.map_err(rejected_body)?;
    let view = gateway.create(request).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn update_resource<K: ResourceKind>(
    State(gateway): State<Gateway<K>>,
    Path(name): Path<String>,
    body: Result<Json<K::Request>, JsonRejection>,
) -> GatewayResult<Json<K::View>> {
    let Json(request) = body.map_err(rejected_body)?;
    Ok(Json(gateway.update(&name, request).await?))
}

async fn delete_resource<K: ResourceKind>(
    State(gateway): State<Gateway<K>>,
    Path(name): Path<String>,
) -> GatewayResult<Json<serde_json::Value>> {
    gateway.delete(&name).await?;
    Ok(Json(json!({ "message": "ok" })))
}

async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "message": "health" }))
}

async fn unknown_route() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "no such route" })),
    )
}

fn rejected_body(rejection: JsonRejection) -> GatewayError {
    GatewayError::validation("body", rejection.body_text())
}

/// Elapsed deadlines become 504, anything else the stack throws is a 500
async fn handle_middleware_error(timeout: Duration, err: BoxError) -> GatewayError {
    if err.is::<tower::timeout::error::Elapsed>() {
        warn!(timeout_ms = timeout.as_millis() as u64, "request deadline elapsed");
        GatewayError::Timeout {
            timeout_ms: timeout.as_millis() as u64,
        }
    } else {
        GatewayError::backend("http", "serve", err.to_string())
    }
}

fn kind_routes<K: ResourceKind>(gateway: Gateway<K>) -> Router {
    let plural = K::plural(&()).into_owned();
    Router::new()
        .route(
            &format!("/{}", plural),
            get(list_resources::<K>).post(create_resource::<K>),
        )
        .route(
            &format!("/{}/", plural),
            get(list_resources::<K>).post(create_resource::<K>),
        )
        .route(
            &format!("/{}/:name", plural),
            get(get_resource::<K>)
                .put(update_resource::<K>)
                .delete(delete_resource::<K>),
        )
        .with_state(gateway)
}

/// Assemble the full application: all kinds, health, tracing and deadline
pub fn build_router(gateways: &Gateways, config: &ServerConfig) -> Router {
    let api = Router::new()
        .merge(kind_routes(gateways.archives.clone()))
        .merge(kind_routes(gateways.cloudinits.clone()))
        .merge(kind_routes(gateways.disks.clone()))
        .merge(kind_routes(gateways.servers.clone()))
        .merge(kind_routes(gateways.loadbalancers.clone()))
        .merge(kind_routes(gateways.isoimages.clone()))
        .route("/healthz", get(healthz))
        .route("/healthz/", get(healthz));

    let prefix = config.path_prefix.trim_end_matches('/');
    let app = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(prefix, api)
    };

    let timeout = config.request_timeout;
    app.fallback(unknown_route).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(HandleErrorLayer::new(move |err: BoxError| {
                handle_middleware_error(timeout, err)
            }))
            .timeout(timeout),
    )
}

/// Bound listener plus the application it serves
pub struct ApiServer {
    config: ServerConfig,
    app: Router,
}

impl ApiServer {
    pub fn new(config: ServerConfig, gateways: &Gateways) -> Self {
        let app = build_router(gateways, &config);
        Self { config, app }
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.port).parse()?;
        Ok(addr)
    }

    /// Serve until Ctrl-C or SIGTERM, then drain in-flight requests
    pub async fn run(self) -> anyhow::Result<()> {
        let addr = self.bind_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", addr, e))?;

        info!(
            address = %addr,
            prefix = %self.config.path_prefix,
            "apiserver listening"
        );

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("apiserver stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl-C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
