pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod store;

use crate::services::{
    analyzer_service::AnalyzerService, extract_service::ExtractService,
    quiz_service::QuizService, session_service::SessionService,
};
use crate::store::{
    local_store::LocalStore, remote_store::RemoteStore, repository::SessionRepository,
};
use axum::{
    routing::{delete, get, post},
    Router,
};
use reqwest::Client;
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub session_service: SessionService,
    pub quiz_service: QuizService,
    pub extract_service: ExtractService,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Self {
        let config = crate::config::get_config();
        // Timeouts are set per request; the analyzer allows up to 120s while
        // vault calls cap at 15s.
        let http_client = Client::new();

        let analyzer = AnalyzerService::new(
            config.gemini_api_key.clone(),
            config.gemini_api_base.clone(),
            http_client.clone(),
        );

        let local = LocalStore::new(pool.clone());
        let remote = config.remote_vault_url.as_ref().and_then(|url| {
            match RemoteStore::new(http_client.clone(), url, config.remote_vault_token.clone()) {
                Ok(store) => Some(store),
                Err(e) => {
                    tracing::warn!("Remote vault disabled: {}", e);
                    None
                }
            }
        });
        let repo = SessionRepository::new(local, remote);

        let session_service = SessionService::new(analyzer.clone(), repo.clone());
        let quiz_service = QuizService::new(repo);
        let extract_service = ExtractService::new(analyzer);

        Self {
            pool,
            session_service,
            quiz_service,
            extract_service,
        }
    }
}

/// Full application router. Everything under `/api` requires a bearer token
/// from the identity provider.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/account/me", get(routes::account::get_profile))
        .route("/api/account/phase", post(routes::account::phase_transition))
        .route("/api/study/analyze", post(routes::study::analyze))
        .route("/api/study/upload", post(routes::study::upload))
        .route("/api/study/history", get(routes::study::history))
        .route(
            "/api/study/practice",
            get(routes::study::get_practice).put(routes::study::save_practice),
        )
        .route("/api/study/vault", delete(routes::study::clear_vault))
        .route(
            "/api/study/sessions/:id",
            delete(routes::study::delete_session),
        )
        .route(
            "/api/study/sessions/:id/export",
            get(routes::study::export_session),
        )
        .route("/api/quiz/sessions/:id/start", post(routes::quiz::start))
        .route("/api/quiz/attempts/:id", get(routes::quiz::get_state))
        .route(
            "/api/quiz/attempts/:id/answer",
            post(routes::quiz::select_option),
        )
        .route(
            "/api/quiz/attempts/:id/navigate",
            post(routes::quiz::navigate),
        )
        .route("/api/quiz/attempts/:id/submit", post(routes::quiz::submit))
        .route("/api/quiz/resume", get(routes::quiz::resume))
        .layer(axum::middleware::from_fn(
            middleware::auth::require_bearer_auth,
        ));

    Router::new()
        .route("/health", get(routes::health::health))
        .merge(api)
        .with_state(state)
}
