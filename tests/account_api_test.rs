use std::env;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use chrono::Utc;
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

fn setup_env() {
    dotenvy::dotenv().ok();
    let db_path =
        std::env::temp_dir().join(format!("exampro_account_test_{}.db", std::process::id()));
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("DATABASE_URL", format!("sqlite://{}", db_path.display()));
    env::set_var("JWT_SECRET", "test_secret_key");
    env::set_var("GEMINI_API_KEY", "test-key");
    env::remove_var("REMOTE_VAULT_URL");
    let _ = exampro_backend::config::init_config();
}

fn bearer_token(uid: &str, name: Option<&str>) -> String {
    let claims = exampro_backend::middleware::auth::Claims {
        sub: uid.to_string(),
        exp: (Utc::now().timestamp() + 3600) as usize,
        email: Some(format!("{}@example.com", uid)),
        name: name.map(|n| n.to_string()),
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
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn profile_reflects_token_claims() {
    let app = setup_app().await;
    let token = bearer_token("profile-user", Some("Ada"));

    let req = Request::builder()
        .method("GET")
        .uri("/api/account/me")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json_body(resp).await;
    assert_eq!(body["uid"], "profile-user");
    assert_eq!(body["email"], "profile-user@example.com");
    assert_eq!(body["displayName"], "Ada");
}

#[tokio::test]
async fn expired_token_is_rejected() {
    let app = setup_app().await;
    let claims = exampro_backend::middleware::auth::Claims {
        sub: "stale-user".to_string(),
        exp: (Utc::now().timestamp() - 3600) as usize,
        email: None,
        name: None,
        email_verified: None,
    };
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(b"test_secret_key"),
    )
    .unwrap();

    let req = Request::builder()
        .method("GET")
        .uri("/api/account/me")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn phase_transitions_follow_identity_events() {
    let app = setup_app().await;
    let token = bearer_token("phase-user", None);

    let cases = [
        (json!({"phase": "landing", "event": {"type": "open_auth"}}), "auth"),
        (
            json!({"phase": "auth", "event": {"type": "signed_in", "verified": true}}),
            "dashboard",
        ),
        (
            json!({"phase": "auth", "event": {"type": "signed_in", "verified": false}}),
            "dashboard",
        ),
        (
            json!({"phase": "auth", "event": {"type": "verification_email_sent"}}),
            "verification_pending",
        ),
        (
            json!({"phase": "verification_pending", "event": {"type": "signed_out"}}),
            "landing",
        ),
        (json!({"phase": "auth", "event": {"type": "signed_out"}}), "auth"),
        (
            json!({"phase": "dashboard", "event": {"type": "signed_out"}}),
            "landing",
        ),
        (
            json!({"phase": "auth", "event": {"type": "back_to_landing"}}),
            "landing",
        ),
    ];

    for (body, expected) in cases {
        let req = Request::builder()
            .method("POST")
            .uri("/api/account/phase")
            .header("authorization", format!("Bearer {}", token))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let out = json_body(resp).await;
        assert_eq!(out["phase"], expected, "from {}", body);
    }
}
