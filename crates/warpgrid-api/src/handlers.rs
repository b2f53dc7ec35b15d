//! REST API handlers.
//!
//! Each handler calls into the `DeploymentManager` and returns JSON
//! responses.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::debug;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

// ── Models ─────────────────────────────────────────────────────

/// GET /api/v1/models
pub async fn list_models(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.manager.models())
}

/// GET /api/v1/models/:model
pub async fn resolve_model(
    State(state): State<ApiState>,
    Path(model): Path<String>,
) -> impl IntoResponse {
    match state.manager.resolve_workload(&model) {
        Some(workload) => ApiResponse::ok(serde_json::json!({
            "model": model,
            "workload": workload,
        }))
        .into_response(),
        None => error_response("model not found", StatusCode::NOT_FOUND).into_response(),
    }
}

// ── Workloads ──────────────────────────────────────────────────

/// GET /api/v1/workloads
pub async fn list_workloads(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.manager.statuses())
}

/// GET /api/v1/workloads/:name
pub async fn get_workload(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.manager.scaler_status(&name) {
        Some(status) => ApiResponse::ok(status).into_response(),
        None => error_response("workload not found", StatusCode::NOT_FOUND).into_response(),
    }
}

// ── Scaling ────────────────────────────────────────────────────

/// POST /api/v1/workloads/:name/active
pub async fn request_active(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    state.manager.request_active(&name);
    debug!(workload = %name, "activity signalled");
    (
        StatusCode::ACCEPTED,
        ApiResponse::ok(serde_json::json!({ "workload": name })),
    )
}

/// Scale request body.
#[derive(serde::Deserialize)]
pub struct ScaleRequest {
    pub replicas: u32,
}

/// PUT /api/v1/workloads/:name/scale
pub async fn set_scale(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Json(req): Json<ScaleRequest>,
) -> impl IntoResponse {
    state.manager.set_desired_scale(&name, req.replicas);
    (
        StatusCode::ACCEPTED,
        ApiResponse::ok(serde_json::json!({
            "workload": name,
            "requested": req.replicas,
        })),
    )
}

// ── Health ─────────────────────────────────────────────────────

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
