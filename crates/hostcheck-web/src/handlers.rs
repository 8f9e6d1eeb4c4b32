//! HTTP request handlers.
//!
//! Everything that touches a probe runs on the blocking pool and is bounded
//! by the configured request timeout.

use std::sync::atomic::Ordering;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use tracing::{error, warn};

use hostcheck_core::analysis::DiagnosticReport;
use hostcheck_core::live::settings::{LiveDbSettings, SettingsInput};
use hostcheck_core::live::snapshot::LiveMetricsSnapshot;
use hostcheck_core::live::SamplerState;

use crate::state::{AppState, LAST_CLIENT_ACTIVITY, now_epoch};

// ============================================================
// Errors
// ============================================================

#[derive(Debug)]
pub(crate) enum ApiError {
    Timeout,
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Timeout => (StatusCode::GATEWAY_TIMEOUT, "request timed out".to_string()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Runs `f` on the blocking pool, bounded by the request timeout.
async fn run_blocking<T, F>(state: &AppState, what: &'static str, f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    LAST_CLIENT_ACTIVITY.store(now_epoch(), Ordering::Relaxed);
    match tokio::time::timeout(state.request_timeout, tokio::task::spawn_blocking(f)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            error!(what, error = %e, "blocking task failed");
            Err(ApiError::Internal(format!("{what} failed")))
        }
        Err(_) => {
            warn!(
                what,
                timeout_ms = state.request_timeout.as_millis() as u64,
                "request timed out"
            );
            Err(ApiError::Timeout)
        }
    }
}

// ============================================================
// Health
// ============================================================

#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Service is healthy", body = String)
    )
)]
pub(crate) async fn handle_health() -> &'static str {
    "ok"
}

// ============================================================
// Diagnostic report
// ============================================================

#[utoipa::path(
    get,
    path = "/api/v1/report",
    responses(
        (status = 200, description = "Full diagnostic report", body = DiagnosticReport),
        (status = 401, description = "Missing or invalid credentials"),
        (status = 504, description = "Probes did not finish in time")
    )
)]
pub(crate) async fn handle_report(
    State(state): State<AppState>,
) -> Result<Json<DiagnosticReport>, ApiError> {
    let analyzer = state.analyzer.clone();
    let sampler = state.sampler.clone();
    let report = run_blocking(&state, "report", move || {
        let settings = sampler.settings();
        sampler.with_live_source(|live| analyzer.analyze(Some(live), &settings))
    })
    .await?;
    Ok(Json(report))
}

// ============================================================
// Live metrics
// ============================================================

#[derive(Serialize, utoipa::ToSchema)]
pub(crate) struct LiveResponse {
    state: SamplerState,
    snapshot: LiveMetricsSnapshot,
}

#[utoipa::path(
    get,
    path = "/api/v1/live",
    responses(
        (status = 200, description = "Cached or freshly sampled live metrics", body = LiveResponse),
        (status = 401, description = "Missing or invalid credentials"),
        (status = 504, description = "Sampling did not finish in time")
    )
)]
pub(crate) async fn handle_live(State(state): State<AppState>) -> Result<Json<LiveResponse>, ApiError> {
    let sampler = state.sampler.clone();
    let (snapshot, sampler_state) = run_blocking(&state, "live", move || {
        let snap = sampler.current();
        (snap, sampler.state())
    })
    .await?;
    Ok(Json(LiveResponse {
        state: sampler_state,
        snapshot: (*snapshot).clone(),
    }))
}

#[derive(Serialize, utoipa::ToSchema)]
pub(crate) struct RefreshResponse {
    /// `sampled`, `cached`, `in_progress` or `disabled`.
    status: String,
    /// Absent only when a sample is in flight and none has completed yet.
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<LiveMetricsSnapshot>,
}

#[utoipa::path(
    post,
    path = "/api/v1/live/refresh",
    responses(
        (status = 200, description = "Refresh outcome", body = RefreshResponse),
        (status = 401, description = "Missing or invalid credentials"),
        (status = 504, description = "Sampling did not finish in time")
    )
)]
pub(crate) async fn handle_refresh(
    State(state): State<AppState>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let sampler = state.sampler.clone();
    let outcome = run_blocking(&state, "refresh", move || sampler.refresh()).await?;
    Ok(Json(RefreshResponse {
        status: outcome.status().to_string(),
        snapshot: outcome.snapshot().map(|s| (**s).clone()),
    }))
}

// ============================================================
// Settings
// ============================================================

#[utoipa::path(
    get,
    path = "/api/v1/live/settings",
    responses(
        (status = 200, description = "Current live monitor settings", body = LiveDbSettings),
        (status = 401, description = "Missing or invalid credentials")
    )
)]
pub(crate) async fn handle_get_settings(
    State(state): State<AppState>,
) -> Result<Json<LiveDbSettings>, ApiError> {
    let sampler = state.sampler.clone();
    let settings = run_blocking(&state, "settings", move || sampler.settings()).await?;
    Ok(Json(settings))
}

#[utoipa::path(
    post,
    path = "/api/v1/live/settings",
    request_body = SettingsInput,
    responses(
        (status = 200, description = "Saved settings after clamping", body = LiveDbSettings),
        (status = 401, description = "Missing or invalid credentials"),
        (status = 500, description = "Settings could not be persisted")
    )
)]
pub(crate) async fn handle_save_settings(
    State(state): State<AppState>,
    Json(input): Json<SettingsInput>,
) -> Result<Json<LiveDbSettings>, ApiError> {
    let sampler = state.sampler.clone();
    let saved = run_blocking(&state, "save settings", move || sampler.save_settings(&input))
        .await?
        .map_err(|e| {
            error!(error = %e, "failed to save live monitor settings");
            ApiError::Internal(e.to_string())
        })?;
    Ok(Json(saved))
}
