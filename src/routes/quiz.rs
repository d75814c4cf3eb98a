use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::quiz_dto::{
    AttemptStateResponse, NavigateRequest, ResumeResponse, SelectOptionRequest, StartQuizRequest,
    SubmitResponse,
};
use crate::middleware::auth::Claims;
use crate::AppState;

#[axum::debug_handler]
pub async fn start(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(session_id): Path<String>,
    Json(req): Json<StartQuizRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let session = state
        .session_service
        .get_session(&claims.sub, &session_id)
        .await?;
    let attempt = state
        .quiz_service
        .start(&claims.sub, &session, req.question_count, req.time_limit_minutes)
        .await?;
    tracing::info!(user = %claims.sub, attempt = %attempt.attempt_id, "Assessment started");
    Ok(Json(AttemptStateResponse::from(attempt)).into_response())
}

#[axum::debug_handler]
pub async fn get_state(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let attempt = state.quiz_service.state(&claims.sub, attempt_id)?;
    Ok(Json(AttemptStateResponse::from(attempt)).into_response())
}

#[axum::debug_handler]
pub async fn select_option(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
    Json(req): Json<SelectOptionRequest>,
) -> crate::error::Result<Response> {
    let attempt = state
        .quiz_service
        .select_option(&claims.sub, attempt_id, req.option_index)
        .await?;
    Ok(Json(AttemptStateResponse::from(attempt)).into_response())
}

#[axum::debug_handler]
pub async fn navigate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
    Json(req): Json<NavigateRequest>,
) -> crate::error::Result<Response> {
    let attempt = state
        .quiz_service
        .navigate(&claims.sub, attempt_id, req.direction)
        .await?;
    Ok(Json(AttemptStateResponse::from(attempt)).into_response())
}

#[axum::debug_handler]
pub async fn submit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(attempt_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let record = state.quiz_service.submit(&claims.sub, attempt_id).await?;
    let score = record.score.unwrap_or(0);
    let total_marks = record.total_marks.unwrap_or(0);
    let time_spent = record.time_spent.unwrap_or(0);
    tracing::info!(
        user = %claims.sub,
        score,
        total = total_marks,
        "Assessment submitted"
    );
    Ok(Json(SubmitResponse {
        record,
        score,
        total_marks,
        time_spent,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn resume(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> crate::error::Result<Response> {
    let attempt = state.quiz_service.resume(&claims.sub).await?;
    Ok(Json(ResumeResponse {
        attempt: attempt.map(AttemptStateResponse::from),
    })
    .into_response())
}
