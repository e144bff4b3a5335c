//! HTTP gateway for Parsec.
//!
//! A thin front end over the agent loop: one chat endpoint plus read-only
//! listings of tools and providers, and a health check. Everything a chat
//! needs (provider credentials, connector settings, prior turns) arrives
//! with the request; the only state shared across requests is the tool
//! services and their repository cache.
//!
//! Built on Axum.

pub mod api;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, header};
use axum::{
    Router,
    response::Json,
    routing::{get, post},
};
use parsec_config::AppConfig;
use parsec_tools::ToolServices;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: AppConfig,
    pub services: Arc<ToolServices>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    pub fn new(config: AppConfig) -> Result<Self, parsec_core::Error> {
        let services = Arc::new(ToolServices::new(&config)?);
        Ok(Self { config, services })
    }
}

/// Build the Axum router with every gateway route.
///
/// Layers applied:
/// - CORS for the browser client
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/chat", post(api::chat_handler))
        .route("/api/tools", get(api::list_tools_handler))
        .route("/api/providers", get(api::list_providers_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let state = Arc::new(GatewayState::new(config)?);
    let app = build_router(state);

    info!(addr = %addr, "Parsec gateway listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.codebase.cache_dir = dir.path().to_path_buf();
        let app = build_router(Arc::new(GatewayState::new(config).unwrap()));

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
