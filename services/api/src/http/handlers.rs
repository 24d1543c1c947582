use super::state::AppState;
use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use medvoice_core::session::{NewSession, Report, ReportRequest};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Identifies the caller; records are owned by this value.
const USER_HEADER: &str = "x-user-email";
const ALL_SESSIONS: &str = "all";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn requesting_user(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST /api/session-chat
/// Create a consultation record for the requesting user
pub async fn create_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<NewSession>,
) -> impl IntoResponse {
    let created_by = requesting_user(&headers);
    let record = state.store.write().await.create(req, created_by, Utc::now());

    info!(
        "Created session {} with {}",
        record.session_id, record.selected_doctor.specialist
    );
    (StatusCode::OK, Json(record))
}

/// GET /api/session-chat?sessionId=<id|all>
pub async fn get_sessions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SessionQuery>,
) -> Response {
    let Some(session_id) = query.session_id.filter(|id| !id.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "sessionId is required");
    };

    let store = state.store.read().await;
    if session_id == ALL_SESSIONS {
        let user = requesting_user(&headers);
        return Json(store.list(user.as_deref())).into_response();
    }

    match store.find(&session_id) {
        Some(record) => Json(record.clone()).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("Session {} not found", session_id),
        ),
    }
}

/// POST /api/medical-report
/// Forward the transcript to the report generator and store its answer
pub async fn generate_report(
    State(state): State<AppState>,
    Json(req): Json<ReportRequest>,
) -> Response {
    let Some(url) = state.report_generator_url.as_deref() else {
        warn!("Report requested but no generator is configured");
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Report generation is not configured",
        );
    };

    info!(
        "Generating report for session {} from {} messages",
        req.session_id,
        req.messages.len()
    );

    // A failed generation stores nothing.
    let report = match request_report(&state.http, url, &req).await {
        Ok(report) => report,
        Err(e) => {
            error!("Report generation failed for session {}: {:#}", req.session_id, e);
            return error_response(StatusCode::BAD_GATEWAY, "Failed to generate report");
        }
    };

    if !state
        .store
        .write()
        .await
        .attach_report(&req.session_id, report.clone())
    {
        warn!("Generated report for unknown session {}", req.session_id);
    }

    Json(report).into_response()
}

async fn request_report(
    http: &reqwest::Client,
    url: &str,
    req: &ReportRequest,
) -> anyhow::Result<Report> {
    let report = http
        .post(url)
        .json(req)
        .send()
        .await
        .context("report generator unreachable")?
        .error_for_status()
        .context("report generator rejected the request")?
        .json::<Report>()
        .await
        .context("report generator returned a malformed report")?;
    Ok(report)
}
