//! # AuditGate HTTP API Module
//!
//! Serves one audit session over a JSON REST API using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /session` - Session snapshot
//! - `GET /gates/{stage}` - Evaluate the gate guarding a stage
//! - `POST /advance` - Advance to the next stage
//! - `POST /tools` - Merge tool patches into the inventory
//! - `POST /integrations` - Record an integration
//! - `POST /opportunities` - Record an automation opportunity
//! - `POST /discover` - Run DNS/API discovery and merge the findings
//! - `GET /summary` - Audit roll-up
//!
//! ## Status Codes
//!
//! - `422` gate not satisfied (body lists the unmet criteria)
//! - `409` stage conflicts (terminal stage, skipped stage, record outside
//!   its stage)
//! - `400` malformed input or unknown tool references
//! - `500` storage failures

mod handlers;
mod types;

pub use handlers::ApiError;
pub use types::{
    AdvanceRequest, AdvanceResponse, DiscoverRequest, ErrorResponse, GateResponse,
    HealthResponse, IntegrationRequest, IntegrationResponse, ToolsRequest,
};

use crate::config::ServerConfig;
use crate::error::AppError;
use auditgate_core::StageGateManager;
use auditgate_discovery::DiscoveryEngine;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::{get, post},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Maximum request body size (2 MB).
const MAX_BODY_SIZE: usize = 2 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    /// The session being served. Writers are serialized by the lock.
    pub manager: Arc<RwLock<StageGateManager>>,
    pub engine: Arc<DiscoveryEngine>,
}

impl AppState {
    #[must_use]
    pub fn new(manager: StageGateManager, engine: DiscoveryEngine) -> Self {
        Self {
            manager: Arc::new(RwLock::new(manager)),
            engine: Arc::new(engine),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build the CORS layer from the configured origins.
///
/// - `None` or no valid origin: localhost only
/// - `["*"]`: all origins
/// - otherwise: exactly the listed origins
fn build_cors_layer(origins: Option<&[String]>) -> CorsLayer {
    match origins {
        Some([wildcard]) if wildcard == "*" => {
            tracing::warn!("CORS: allowing ALL origins. This is insecure for production!");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => {
                        tracing::info!("CORS: allowing origin: {}", origin);
                        Some(value)
                    }
                    Err(e) => {
                        tracing::warn!("CORS: invalid origin '{}': {}", origin, e);
                        None
                    }
                })
                .collect();
            if allowed.is_empty() {
                tracing::warn!("CORS: no valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE])
            }
        }
        None => build_localhost_cors(),
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
pub fn create_router(state: AppState, server: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/session", get(handlers::session_handler))
        .route("/summary", get(handlers::summary_handler))
        .route("/gates/{stage}", get(handlers::gate_handler))
        .route("/advance", post(handlers::advance_handler))
        .route("/tools", post(handlers::tools_handler))
        .route("/integrations", post(handlers::integration_handler))
        .route("/opportunities", post(handlers::opportunity_handler))
        .route("/discover", post(handlers::discover_handler))
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(build_cors_layer(server.cors_origins.as_deref()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Serve `manager`'s session until Ctrl+C.
pub async fn run_server(
    manager: StageGateManager,
    engine: DiscoveryEngine,
    server: &ServerConfig,
) -> Result<(), AppError> {
    let addr = format!("{}:{}", server.host, server.port);
    let session_id = manager.session_id().to_string();
    let router = create_router(AppState::new(manager, engine), server);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::Io(format!("bind {addr} failed: {e}")))?;

    tracing::info!(%addr, %session_id, "AuditGate HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Io(format!("server error: {e}")))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(%e, "cannot listen for Ctrl+C; serving until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
