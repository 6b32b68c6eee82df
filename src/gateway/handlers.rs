use super::AppState;
use super::sse::build_sse_response;
use crate::error::RelayError;
use crate::task::Submission;
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;

/// Lowercase form of the `Last-Event-ID` request header.
const LAST_EVENT_ID: &str = "last-event-id";

#[derive(Debug, Default, Deserialize)]
pub(super) struct EventsQuery {
    /// Resume cursor for clients that cannot set headers.
    pub after: Option<u64>,
}

/// Resume point: `Last-Event-ID` header first, then `?after=`.
pub(super) fn resume_after(headers: &HeaderMap, query: &EventsQuery) -> Option<u64> {
    headers
        .get(LAST_EVENT_ID)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .or(query.after)
}

fn error_response(error: &RelayError) -> Response {
    let status = match error {
        RelayError::UnknownTask(_) => StatusCode::NOT_FOUND,
        RelayError::UnknownAgent(_) | RelayError::InvalidSubmission(_) => StatusCode::BAD_REQUEST,
        RelayError::Upstream(_) | RelayError::Transport(_) => StatusCode::BAD_GATEWAY,
        RelayError::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::warn!(error = %error, "request failed");
    }
    let body = serde_json::json!({ "error": error.to_string() });
    (status, Json(body)).into_response()
}

/// GET /health: liveness and role
pub(super) async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let body = serde_json::json!({
        "status": "ok",
        "role": state.role,
        "tasks": state.registry.task_count(),
    });
    Json(body)
}

/// POST /tasks: accept work, answer with its id right away
pub(super) async fn handle_submit(
    State(state): State<AppState>,
    Json(submission): Json<Submission>,
) -> Response {
    match state.hop.upstream().submit(submission).await {
        Ok(task_id) => {
            tracing::info!(role = %state.role, task_id = %task_id, "task accepted");
            let body = serde_json::json!({ "task_id": task_id });
            (StatusCode::ACCEPTED, Json(body)).into_response()
        }
        Err(error) => error_response(&error),
    }
}

/// GET /tasks/{id}/events: ordered event stream with resume
pub(super) async fn handle_events(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    Query(query): Query<EventsQuery>,
    headers: HeaderMap,
) -> Response {
    let after = resume_after(&headers, &query);
    match state.hop.subscribe(&task_id, after).await {
        Ok(subscription) => build_sse_response(subscription, state.retry_ms),
        Err(error) => error_response(&error),
    }
}

/// GET /tasks/{id}: post-hoc state and full event log
pub(super) async fn handle_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Response {
    if let Err(error) = state.hop.upstream().ensure(&task_id).await {
        return error_response(&error);
    }
    match state.registry.snapshot(&task_id) {
        Some(snapshot) => Json(snapshot).into_response(),
        None => error_response(&RelayError::UnknownTask(task_id)),
    }
}
