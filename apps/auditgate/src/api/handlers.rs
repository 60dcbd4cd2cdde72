//! # API Endpoint Handlers

use super::{
    AppState,
    types::{
        AdvanceRequest, AdvanceResponse, DiscoverRequest, ErrorResponse, GateResponse,
        HealthResponse, IntegrationRequest, IntegrationResponse, ToolsRequest,
    },
};
use crate::enrichment::{DiscoveryTargets, EnrichmentOutcome};
use crate::error::AppError;
use auditgate_core::{AuditError, IntegrationRecord, OpportunityRecord, Stage};
use auditgate_discovery::DiscoveryError;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// Handler error carrying its HTTP status.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(e: AppError) -> Self {
        Self(e)
    }
}

impl From<AuditError> for ApiError {
    fn from(e: AuditError) -> Self {
        Self(AppError::Audit(e))
    }
}

impl ApiError {
    /// HTTP status for the wrapped error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AppError::Audit(e) => match e {
                AuditError::GateNotSatisfied { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                AuditError::TerminalStage(_)
                | AuditError::InvalidTransition { .. }
                | AuditError::StageMismatch { .. } => StatusCode::CONFLICT,
                AuditError::SessionNotFound(_) => StatusCode::NOT_FOUND,
                AuditError::ReferentialIntegrity { .. }
                | AuditError::InvalidRecord(_)
                | AuditError::InvalidInventory(_)
                | AuditError::InvalidSessionId(_) => StatusCode::BAD_REQUEST,
                AuditError::CorruptState { .. } | AuditError::Storage(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::Discovery(DiscoveryError::InvalidDomain(_)) | AppError::Usage(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Discovery(_) | AppError::Config(_) | AppError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let reasons = match &self.0 {
            AppError::Audit(AuditError::GateNotSatisfied { reasons, .. }) => reasons.clone(),
            _ => Vec::new(),
        };
        let body = ErrorResponse {
            error: self.0.to_string(),
            reasons,
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// SESSION HANDLERS
// =============================================================================

/// Full session snapshot.
pub async fn session_handler(State(state): State<AppState>) -> impl IntoResponse {
    let manager = state.manager.read().await;
    Json(manager.session().clone())
}

/// Audit roll-up.
pub async fn summary_handler(State(state): State<AppState>) -> impl IntoResponse {
    let manager = state.manager.read().await;
    Json(manager.summary())
}

// =============================================================================
// GATE HANDLERS
// =============================================================================

/// Evaluate the gate guarding `stage` (name or number).
pub async fn gate_handler(
    State(state): State<AppState>,
    Path(stage): Path<String>,
) -> ApiResult<Json<GateResponse>> {
    let target: Stage = stage.parse()?;
    let manager = state.manager.read().await;
    Ok(Json(GateResponse {
        report: manager.evaluate_gate(target),
        can_advance: manager.can_advance(target),
    }))
}

/// Advance to the next stage.
pub async fn advance_handler(
    State(state): State<AppState>,
    Json(request): Json<AdvanceRequest>,
) -> ApiResult<Json<AdvanceResponse>> {
    let mut manager = state.manager.write().await;
    let from = manager.current_stage();
    let target = match request.target.as_deref() {
        Some(target) => target.parse()?,
        None => from.next().ok_or(AuditError::TerminalStage(from))?,
    };
    let session = manager.advance(target)?;
    tracing::info!(session_id = %session.session_id, from = %from, to = %target, "stage advanced");
    Ok(Json(AdvanceResponse {
        from,
        current_stage: session.current_stage,
        stage_completion: session.stage_completion.clone(),
    }))
}

// =============================================================================
// RECORD HANDLERS
// =============================================================================

/// Merge tool patches into the inventory.
pub async fn tools_handler(
    State(state): State<AppState>,
    Json(request): Json<ToolsRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut manager = state.manager.write().await;
    let outcome = manager.merge_tool_inventory(request.into_patches())?;
    Ok(Json(outcome))
}

/// Record an integration (Assessment stage only).
pub async fn integration_handler(
    State(state): State<AppState>,
    Json(request): Json<IntegrationRequest>,
) -> ApiResult<impl IntoResponse> {
    let record = IntegrationRecord::from(request);
    let mut manager = state.manager.write().await;
    manager.append_integration(record.clone())?;
    let coverage = manager.summary().integrations.coverage;
    Ok((
        StatusCode::CREATED,
        Json(IntegrationResponse {
            integration: record,
            coverage,
        }),
    ))
}

/// Record an automation opportunity (Opportunities stage only).
pub async fn opportunity_handler(
    State(state): State<AppState>,
    Json(record): Json<OpportunityRecord>,
) -> ApiResult<impl IntoResponse> {
    let mut manager = state.manager.write().await;
    manager.append_opportunity(record.clone())?;
    Ok((StatusCode::CREATED, Json(record)))
}

// =============================================================================
// DISCOVERY HANDLER
// =============================================================================

/// Run discovery and merge the findings.
///
/// Probes run without holding the session lock; only the merge takes it.
pub async fn discover_handler(
    State(state): State<AppState>,
    Json(request): Json<DiscoverRequest>,
) -> ApiResult<Json<EnrichmentOutcome>> {
    let targets = {
        let manager = state.manager.read().await;
        DiscoveryTargets::of(manager.session(), request.domain.as_deref())
    };
    let report = targets.probe(&state.engine).await?;
    let stats = report.stats;

    let mut manager = state.manager.write().await;
    let merge = manager.merge_tool_inventory(report.patches)?;
    tracing::info!(
        session_id = manager.session_id(),
        added = merge.added.len(),
        augmented = merge.augmented.len(),
        elapsed_ms = stats.elapsed_ms,
        "discovery merged"
    );
    Ok(Json(EnrichmentOutcome { merge, stats }))
}
