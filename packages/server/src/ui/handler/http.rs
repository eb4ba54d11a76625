//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
};

use crate::{
    domain::{RepositoryError, ScheduledJob},
    infrastructure::dto::http::{
        ErrorResponse, HealthResponse, RunScheduledJobsRequest, RunScheduledJobsResponse,
        ScheduleJobResponse,
    },
    ui::state::AppState,
    usecase::RunScheduledJobsError,
};

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse::new(message)))
}

/// Super-user check for the `/intranet` endpoints
fn require_su(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "admin token is not configured",
        ));
    };
    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    if !presented.is_some_and(|token| token_matches(token, expected)) {
        tracing::warn!("Rejected intranet request without a valid admin token");
        return Err(api_error(StatusCode::UNAUTHORIZED, "unauthorized"));
    }
    Ok(())
}

/// Byte comparison whose timing does not depend on where the tokens differ.
fn token_matches(presented: &str, expected: &str) -> bool {
    if presented.len() != expected.len() {
        return false;
    }
    presented
        .bytes()
        .zip(expected.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Arm timers for every job due within `seconds`
pub async fn run_scheduled_jobs(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RunScheduledJobsRequest>,
) -> Result<Json<RunScheduledJobsResponse>, ApiError> {
    require_su(&state, &headers)?;

    match state.scheduled_jobs.execute(request.seconds).await {
        Ok(armed) => Ok(Json(RunScheduledJobsResponse { armed })),
        Err(e @ RunScheduledJobsError::InvalidHorizon(_)) => {
            Err(api_error(StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(e @ RunScheduledJobsError::Repository(_)) => {
            tracing::error!("runScheduledJobs failed: {}", e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// Store a new scheduled job
pub async fn schedule_job(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(job): Json<ScheduledJob>,
) -> Result<(StatusCode, Json<ScheduleJobResponse>), ApiError> {
    require_su(&state, &headers)?;

    let id = job.id.to_string();
    match state.scheduled_jobs.schedule(job).await {
        Ok(()) => Ok((StatusCode::CREATED, Json(ScheduleJobResponse { id }))),
        Err(RunScheduledJobsError::Repository(RepositoryError::Duplicate(id))) => Err(api_error(
            StatusCode::CONFLICT,
            format!("job '{}' already exists", id),
        )),
        Err(e) => {
            tracing::error!("Scheduling job '{}' failed: {}", id, e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}
