use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::{
    models::{
        AssistRequest, CreateSessionRequest, FinishSessionRequest, RunRequest, RunTestsRequest,
    },
    services::{session_service::SessionError, AppState},
};

fn status_for(err: &SessionError) -> StatusCode {
    match err {
        SessionError::NotFound => StatusCode::NOT_FOUND,
        SessionError::ProblemNotFound(_) => StatusCode::NOT_FOUND,
        SessionError::NotActive => StatusCode::CONFLICT,
        SessionError::AssistLocked => StatusCode::FORBIDDEN,
        SessionError::AssistFailed(_) => StatusCode::BAD_GATEWAY,
        SessionError::FinalizeNotRetryable => StatusCode::CONFLICT,
        SessionError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn validate<T: Validate>(req: &T) -> Result<(), (StatusCode, String)> {
    req.validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    validate(&req)?;
    tracing::info!(
        "Creating session for user_id={}, problem_id={}",
        req.user_id,
        req.problem_id
    );

    match state.sessions.create_session(req).await {
        Ok(response) => Ok((StatusCode::CREATED, Json(response))),
        Err(e) => {
            tracing::error!("Failed to create session: {}", e);
            Err((status_for(&e), e.to_string()))
        }
    }
}

pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match state.sessions.get_status(&session_id).await {
        Ok(status) => Ok((StatusCode::OK, Json(status))),
        Err(e) => Err((status_for(&e), e.to_string())),
    }
}

pub async fn start_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::info!("Starting session: {}", session_id);

    match state.sessions.start_session(&session_id).await {
        Ok(status) => Ok((StatusCode::OK, Json(status))),
        Err(e) => {
            tracing::error!("Failed to start session {}: {}", session_id, e);
            Err((status_for(&e), e.to_string()))
        }
    }
}

pub async fn run_once(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(req): Json<RunRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    validate(&req)?;
    tracing::info!("Running code for session: {}", session_id);

    match state.sessions.run_once(&session_id, req).await {
        Ok(result) => Ok((StatusCode::OK, Json(result))),
        Err(e) => Err((status_for(&e), e.to_string())),
    }
}

pub async fn run_tests(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(req): Json<RunTestsRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    validate(&req)?;
    tracing::info!("Running test harness for session: {}", session_id);

    match state.sessions.run_tests(&session_id, req).await {
        Ok(response) => Ok((StatusCode::OK, Json(response))),
        Err(e) => {
            tracing::error!("Test run failed for session {}: {}", session_id, e);
            Err((status_for(&e), e.to_string()))
        }
    }
}

pub async fn list_hints(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    match state.sessions.list_hints(&session_id).await {
        Ok(response) => Ok((StatusCode::OK, Json(response))),
        Err(e) => Err((status_for(&e), e.to_string())),
    }
}

pub async fn request_assist(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(req): Json<AssistRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    validate(&req)?;
    tracing::info!("Assist requested for session: {}", session_id);

    match state.sessions.request_assist(&session_id, req).await {
        Ok(response) => Ok((StatusCode::OK, Json(response))),
        Err(e) => Err((status_for(&e), e.to_string())),
    }
}

pub async fn finish_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(req): Json<FinishSessionRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::info!("Finishing session: {}", session_id);

    match state.sessions.finish_session(&session_id, false, req).await {
        Ok(response) => Ok((StatusCode::OK, Json(response))),
        Err(e) => {
            tracing::error!("Failed to finish session {}: {}", session_id, e);
            Err((status_for(&e), e.to_string()))
        }
    }
}

pub async fn retry_finalize(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    tracing::info!("Retrying finalize for session: {}", session_id);

    match state.sessions.retry_finalize(&session_id).await {
        Ok(response) => Ok((StatusCode::OK, Json(response))),
        Err(e) => Err((status_for(&e), e.to_string())),
    }
}
