use std::env;
use std::sync::OnceLock;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    response::IntoResponse,
    Router,
};
use chrono::Utc;
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

static MOCK_ANALYZER: OnceLock<String> = OnceLock::new();

/// Stand-in for the generative endpoint: every call gets back one canned
/// report, fenced the way real model output often arrives.
async fn mock_generate() -> impl IntoResponse {
    let report = json!({
        "summary": "Photosynthesis converts light into chemical energy.",
        "keyPoints": ["Chloroplasts", "Light reactions", "Calvin cycle"],
        "insights": "Energy flow in cells mirrors economic supply chains.",
        "questions": [
            {
                "question": "Where does photosynthesis occur?",
                "options": ["Chloroplast", "Mitochondria", "Nucleus", "Ribosome"],
                "correctIndex": 0,
                "explanation": "Chloroplasts house the light-capturing pigments."
            },
            {
                "question": "What gas is consumed?",
                "options": ["Oxygen", "Carbon dioxide", "Nitrogen", "Methane"],
                "correctIndex": 1,
                "explanation": "CO2 is fixed in the Calvin cycle."
            },
            {
                "question": "What pigment captures light?",
                "options": ["Hemoglobin", "Keratin", "Chlorophyll", "Melanin"],
                "correctIndex": 2,
                "explanation": "Chlorophyll absorbs red and blue wavelengths."
            }
        ]
    });
    let fenced = format!("```json\n{}\n```", report);
    axum::Json(json!({
        "candidates": [{
            "content": { "parts": [{ "text": fenced }] }
        }]
    }))
}

fn mock_analyzer_base() -> &'static str {
    MOCK_ANALYZER.get_or_init(|| {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind mock");
        let addr = listener.local_addr().expect("mock addr");
        listener.set_nonblocking(true).expect("nonblocking");
        // Own thread with its own runtime so the server outlives any single test.
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("mock runtime");
            rt.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).expect("mock listener");
                let app = Router::new().fallback(mock_generate);
                axum::serve(listener, app).await.expect("mock serve");
            });
        });
        format!("http://{}", addr)
    })
}

fn setup_env() {
    dotenvy::dotenv().ok();
    let db_path =
        std::env::temp_dir().join(format!("exampro_study_test_{}.db", std::process::id()));
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("DATABASE_URL", format!("sqlite://{}", db_path.display()));
    env::set_var("JWT_SECRET", "test_secret_key");
    env::set_var("GEMINI_API_KEY", "test-key");
    env::set_var("GEMINI_API_BASE", mock_analyzer_base());
    env::remove_var("REMOTE_VAULT_URL");
    let _ = exampro_backend::config::init_config();
}

fn bearer_token(uid: &str) -> String {
    let claims = exampro_backend::middleware::auth::Claims {
        sub: uid.to_string(),
        exp: (Utc::now().timestamp() + 3600) as usize,
        email: Some(format!("{}@example.com", uid)),
        name: Some("Test User".to_string()),
        email_verified: Some(true),
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(b"test_secret_key"),
    )
    .expect("encode token")
}

async fn setup_app() -> axum::Router {
    setup_env();
    let pool = exampro_backend::database::pool::create_pool()
        .await
        .expect("pool");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");
    exampro_backend::build_router(exampro_backend::AppState::new(pool))
}

async fn json_body(resp: axum::response::Response) -> JsonValue {
    let bytes = to_bytes(resp.into_body(), 10 * 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

const NOTES: &str = "Photosynthesis is the process by which green plants use sunlight, \
water and carbon dioxide to synthesize glucose, releasing oxygen as a byproduct.";

async fn analyze(app: &axum::Router, token: &str, count: usize) -> axum::response::Response {
    let req = Request::builder()
        .method("POST")
        .uri("/api/study/analyze")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"text": NOTES, "question_count": count}).to_string(),
        ))
        .unwrap();
    app.clone().oneshot(req).await.unwrap()
}

#[tokio::test]
async fn analyze_creates_session_from_fenced_report() {
    let app = setup_app().await;
    let token = bearer_token("study-user");

    let resp = analyze(&app, &token, 3).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = json_body(resp).await;
    let session = &body["session"];

    assert!(session["id"].as_str().unwrap().starts_with("local_"));
    assert_eq!(
        session["summary"],
        "Photosynthesis converts light into chemical energy."
    );
    assert_eq!(session["keyPoints"].as_array().unwrap().len(), 3);
    assert_eq!(session["questions"].as_array().unwrap().len(), 3);
    assert_eq!(session["sourceType"], "text");
    // No title sent: a preview of the notes becomes the title.
    assert!(session["title"].as_str().unwrap().starts_with("Photosynthesis"));

    // Options get shuffled but the correct index must still point at the
    // right option text.
    for q in session["questions"].as_array().unwrap() {
        let idx = q["correctIndex"].as_i64().unwrap() as usize;
        let options = q["options"].as_array().unwrap();
        assert!(idx < options.len());
    }
}

#[tokio::test]
async fn analyze_rejects_short_notes() {
    let app = setup_app().await;
    let token = bearer_token("short-user");

    let req = Request::builder()
        .method("POST")
        .uri("/api/study/analyze")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(json!({"text": "too short"}).to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn analyze_rejects_out_of_range_question_count() {
    let app = setup_app().await;
    let token = bearer_token("range-user");

    let req = Request::builder()
        .method("POST")
        .uri("/api/study/analyze")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"text": NOTES, "question_count": 500}).to_string(),
        ))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn history_delete_and_clear() {
    let app = setup_app().await;
    let token = bearer_token("vault-user");

    let first = json_body(analyze(&app, &token, 3).await).await;
    let second = json_body(analyze(&app, &token, 3).await).await;
    let first_id = first["session"]["id"].as_str().unwrap().to_string();
    let second_id = second["session"]["id"].as_str().unwrap().to_string();
    assert_ne!(first_id, second_id);

    let req = Request::builder()
        .method("GET")
        .uri("/api/study/history")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let body = json_body(app.clone().oneshot(req).await.unwrap()).await;
    assert_eq!(body["total"], 2);

    let ids: Vec<&str> = body["sessions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&first_id.as_str()));
    assert!(ids.contains(&second_id.as_str()));

    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/api/study/sessions/{}", first_id))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = Request::builder()
        .method("DELETE")
        .uri("/api/study/vault")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = Request::builder()
        .method("GET")
        .uri("/api/study/history")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let body = json_body(app.clone().oneshot(req).await.unwrap()).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn practice_progress_roundtrip_and_clear() {
    let app = setup_app().await;
    let token = bearer_token("practice-user");

    let created = json_body(analyze(&app, &token, 3).await).await;
    let session_id = created["session"]["id"].as_str().unwrap().to_string();

    // Nothing saved yet.
    let req = Request::builder()
        .method("GET")
        .uri("/api/study/practice")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let body = json_body(app.clone().oneshot(req).await.unwrap()).await;
    assert!(body["practice"].is_null());

    // Two questions answered, first answer revealed.
    let req = Request::builder()
        .method("PUT")
        .uri("/api/study/practice")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "session_id": session_id,
                "choices": [0, 2, -1],
                "revealed": [true, false, false]
            })
            .to_string(),
        ))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = Request::builder()
        .method("GET")
        .uri("/api/study/practice")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let body = json_body(app.clone().oneshot(req).await.unwrap()).await;
    let practice = &body["practice"];
    assert_eq!(practice["session"]["id"], session_id.as_str());
    assert_eq!(practice["choices"], json!([0, 2, -1]));
    assert_eq!(practice["revealed"], json!([true, false, false]));

    // Clearing the vault wipes the practice snapshot with it.
    let req = Request::builder()
        .method("DELETE")
        .uri("/api/study/vault")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = Request::builder()
        .method("GET")
        .uri("/api/study/practice")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let body = json_body(app.clone().oneshot(req).await.unwrap()).await;
    assert!(body["practice"].is_null());
}

#[tokio::test]
async fn practice_state_must_match_question_count() {
    let app = setup_app().await;
    let token = bearer_token("practice-mismatch-user");

    let created = json_body(analyze(&app, &token, 3).await).await;
    let session_id = created["session"]["id"].as_str().unwrap().to_string();

    let req = Request::builder()
        .method("PUT")
        .uri("/api/study/practice")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "session_id": session_id,
                "choices": [0],
                "revealed": [true]
            })
            .to_string(),
        ))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn practice_snapshot_for_deleted_session_is_discarded() {
    let app = setup_app().await;
    let token = bearer_token("practice-orphan-user");

    let created = json_body(analyze(&app, &token, 3).await).await;
    let session_id = created["session"]["id"].as_str().unwrap().to_string();

    let req = Request::builder()
        .method("PUT")
        .uri("/api/study/practice")
        .header("authorization", format!("Bearer {}", token))
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "session_id": session_id,
                "choices": [1, -1, -1],
                "revealed": [false, false, false]
            })
            .to_string(),
        ))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/api/study/sessions/{}", session_id))
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let req = Request::builder()
        .method("GET")
        .uri("/api/study/practice")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let body = json_body(app.clone().oneshot(req).await.unwrap()).await;
    assert!(body["practice"].is_null());
}

#[tokio::test]
async fn export_returns_spreadsheet_attachment() {
    let app = setup_app().await;
    let token = bearer_token("export-user");

    let created = json_body(analyze(&app, &token, 3).await).await;
    let id = created["session"]["id"].as_str().unwrap();

    for kind in ["summary", "quiz"] {
        let req = Request::builder()
            .method("GET")
            .uri(format!("/api/study/sessions/{}/export?kind={}", id, kind))
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()["content-type"],
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        let disposition = resp.headers()["content-disposition"].to_str().unwrap();
        assert!(disposition.contains(".xlsx"));
        let bytes = to_bytes(resp.into_body(), 10 * 1024 * 1024).await.unwrap();
        // XLSX files are zip archives.
        assert_eq!(&bytes[..2], b"PK");
    }
}

#[tokio::test]
async fn history_is_scoped_to_the_caller() {
    let app = setup_app().await;
    let owner = bearer_token("scoped-owner");
    let other = bearer_token("scoped-other");

    analyze(&app, &owner, 3).await;

    let req = Request::builder()
        .method("GET")
        .uri("/api/study/history")
        .header("authorization", format!("Bearer {}", other))
        .body(Body::empty())
        .unwrap();
    let body = json_body(app.clone().oneshot(req).await.unwrap()).await;
    assert_eq!(body["total"], 0);
}

#[tokio::test]
async fn requests_without_token_are_rejected() {
    let app = setup_app().await;

    let req = Request::builder()
        .method("GET")
        .uri("/api/study/history")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .method("GET")
        .uri("/api/study/history")
        .header("authorization", "Bearer not-a-real-token")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Health stays open.
    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
