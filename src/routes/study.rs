use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    Extension,
};
use validator::Validate;

use crate::dto::study_dto::{
    AnalyzeRequest, AnalyzeResponse, ExportKind, ExportQuery, HistoryResponse, PracticeStateDto,
    PracticeStateRequest, PracticeStateResponse,
};
use crate::middleware::auth::Claims;
use crate::models::session::SourceType;
use crate::services::export_service::ExportService;
use crate::services::extract_service::ExtractService;
use crate::AppState;

const DEFAULT_QUESTION_COUNT: usize = 10;

#[axum::debug_handler]
pub async fn analyze(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AnalyzeRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let count = req.question_count.unwrap_or(DEFAULT_QUESTION_COUNT);
    let session = state
        .session_service
        .analyze_material(&claims.sub, &req.text, req.title, SourceType::Text, count)
        .await?;
    tracing::info!(user = %claims.sub, session = ?session.id, "Material analyzed");
    Ok((StatusCode::CREATED, Json(AnalyzeResponse { session })).into_response())
}

#[axum::debug_handler]
pub async fn upload(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: axum::extract::Multipart,
) -> crate::error::Result<Response> {
    let mut file_bytes: Option<(String, String, bytes::Bytes)> = None;
    let mut question_count = DEFAULT_QUESTION_COUNT;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(crate::error::Error::Multipart)?
    {
        let name = field.name().unwrap_or("").to_string();
        if name == "file" {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let content_type = field.content_type().unwrap_or("").to_string();
            let data = field.bytes().await.map_err(crate::error::Error::Multipart)?;
            file_bytes = Some((filename, content_type, data));
        } else if name == "question_count" {
            let raw = field.text().await.map_err(crate::error::Error::Multipart)?;
            question_count = raw.trim().parse().map_err(|_| {
                crate::error::Error::BadRequest("Invalid question count".to_string())
            })?;
        }
    }

    let Some((filename, content_type, data)) = file_bytes else {
        return Err(crate::error::Error::BadRequest(
            "No file provided".to_string(),
        ));
    };
    if data.is_empty() {
        return Err(crate::error::Error::BadRequest("Empty file".to_string()));
    }

    let source_type = ExtractService::source_type_for(&content_type)?;
    let text = state.extract_service.extract_text(&data, &content_type).await?;

    let session = state
        .session_service
        .analyze_material(
            &claims.sub,
            &text,
            Some(filename),
            source_type,
            question_count,
        )
        .await?;
    tracing::info!(user = %claims.sub, session = ?session.id, "Uploaded material analyzed");
    Ok((StatusCode::CREATED, Json(AnalyzeResponse { session })).into_response())
}

#[axum::debug_handler]
pub async fn history(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> crate::error::Result<Response> {
    let sessions = state.session_service.history(&claims.sub).await?;
    let total = sessions.len();
    Ok(Json(HistoryResponse { sessions, total }).into_response())
}

#[axum::debug_handler]
pub async fn delete_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> crate::error::Result<Response> {
    state.session_service.delete_session(&claims.sub, &id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[axum::debug_handler]
pub async fn clear_vault(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> crate::error::Result<Response> {
    state.session_service.clear_vault(&claims.sub).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[axum::debug_handler]
pub async fn save_practice(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PracticeStateRequest>,
) -> crate::error::Result<Response> {
    state
        .session_service
        .save_practice_state(&claims.sub, &req.session_id, &req.choices, &req.revealed)
        .await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

#[axum::debug_handler]
pub async fn get_practice(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> crate::error::Result<Response> {
    let practice = state.session_service.practice_state(&claims.sub).await?;
    Ok(Json(PracticeStateResponse {
        practice: practice.map(PracticeStateDto::from),
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn export_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> crate::error::Result<Response> {
    let session = state.session_service.get_session(&claims.sub, &id).await?;

    let (bytes, prefix) = match query.kind {
        ExportKind::Summary => (ExportService::generate_summary_xlsx(&session)?, "Summary"),
        ExportKind::Quiz => (ExportService::generate_quiz_xlsx(&session)?, "Quiz"),
    };

    let safe_title: String = session
        .title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let disposition = format!("attachment; filename=\"{}_{}.xlsx\"", prefix, safe_title);

    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string(),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
