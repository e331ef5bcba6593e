use std::{path::PathBuf, sync::Arc, time::Duration};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{
        Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
    },
    routing::get,
};
use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use server::{
    app, app_with,
    auth::SessionUser,
    config::Config,
    resolver::NoopResolver,
    state::AppState,
};
use tower::ServiceExt;

const USER: &str = "123456789012345678";

fn test_config() -> Config {
    Config {
        static_dir: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../public"),
        ..Config::default()
    }
}

fn test_state() -> Arc<AppState> {
    AppState::with_resolver(test_config(), Arc::new(NoopResolver), None)
}

async fn explode() -> &'static str {
    panic!("cache shard poisoned")
}

fn exploding_app(production: bool) -> Router {
    let config = Config {
        production,
        ..test_config()
    };
    let state = AppState::with_resolver(config, Arc::new(NoopResolver), None);

    app_with(state, Router::new().route("/explode", get(explode)))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    (status, headers, body.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::get(uri).body(Body::empty()).unwrap();
    let (status, _, body) = send(app, request).await;

    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_invalid_id_is_400_everywhere() {
    let app = app(test_state());

    for endpoint in ["profile", "status", "presence", "connections", "user"] {
        for bad in ["abc", "1234", "12345678901234567890", "12345678901234567a"] {
            let (status, body) = get_json(&app, &format!("/api/{endpoint}/{bad}")).await;

            assert_eq!(status, StatusCode::BAD_REQUEST, "{endpoint}/{bad}");
            assert_eq!(body["error"], "Invalid Discord ID format");
            assert_eq!(body["message"], "Discord IDs are typically 17-19 digits.");
        }
    }
}

#[tokio::test]
async fn test_profile_without_bot() {
    let app = app(test_state());

    let (status, body) = get_json(&app, &format!("/api/profile/{USER}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], USER);
    assert!(["online", "idle", "dnd", "offline"].contains(&body["status"].as_str().unwrap()));
    assert!(body["badges"].is_array());
    assert!(body["connections"].is_array());

    let created = DateTime::parse_from_rfc3339(body["created_at"].as_str().unwrap()).unwrap();
    assert!(created.with_timezone(&Utc) < Utc::now());

    let (_, again) = get_json(&app, &format!("/api/profile/{USER}")).await;
    assert_eq!(body, again);
}

#[tokio::test]
async fn test_sub_resources() {
    let app = app(test_state());

    let (status, body) = get_json(&app, &format!("/api/status/{USER}")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["status"].is_string());

    let (status, body) = get_json(&app, &format!("/api/presence/{USER}")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["activities"].is_array());

    let (status, body) = get_json(&app, &format!("/api/connections/{USER}")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["connections"].is_array());
}

#[tokio::test]
async fn test_user_summary_field_names() {
    let app = app(test_state());

    let (status, body) = get_json(&app, &format!("/api/user/{USER}")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["avatarURL"].as_str().unwrap().starts_with("https://cdn.discordapp.com/"));
    assert!(body.get("bannerURL").is_some());
    assert!(body.get("badges").is_none());
}

#[tokio::test]
async fn test_health() {
    let app = app(test_state());

    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_me_requires_session() {
    let app = app(test_state());

    let (status, body) = get_json(&app, "/api/me").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Authentication required");
}

#[tokio::test]
async fn test_me_with_session() {
    let state = test_state();
    let app = app(state.clone());

    let sid = state.sessions.create(SessionUser {
        id: USER.to_string(),
        username: "someone".to_string(),
        discriminator: "0".to_string(),
        avatar: "https://cdn.discordapp.com/embed/avatars/0.png".to_string(),
        access_token: "secret-token".to_string(),
        created_at: Utc::now(),
    });

    let request = Request::get("/api/me")
        .header(COOKIE, format!("sid={sid}"))
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    let body: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "someone");
    assert!(body.get("access_token").is_none());
}

#[tokio::test]
async fn test_login_unavailable_without_oauth() {
    let app = app(test_state());

    let request = Request::get("/auth/discord").body(Body::empty()).unwrap();
    let (status, headers, _) = send(&app, request).await;

    assert!(status.is_redirection());
    assert_eq!(headers[LOCATION], "/?error=login_unavailable");
}

#[tokio::test]
async fn test_callback_with_forged_state_fails() {
    let app = app(test_state());

    let request = Request::get("/auth/discord/callback?code=abc&state=forged")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(&app, request).await;

    assert!(status.is_redirection());
    assert_eq!(headers[LOCATION], "/?error=auth_failed");
    assert!(headers.get(SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = app(test_state());

    let request = Request::get("/auth/logout")
        .header(COOKIE, "sid=whatever")
        .body(Body::empty())
        .unwrap();
    let (status, headers, _) = send(&app, request).await;

    assert!(status.is_redirection());
    assert_eq!(headers[LOCATION], "/");
    assert!(headers[SET_COOKIE].to_str().unwrap().contains("Max-Age=0"));
}

#[tokio::test]
async fn test_webhook_presence_reaches_status() {
    let state = test_state();
    let app = app(state.clone());

    let payload = json!({
        "user": { "id": USER },
        "status": "dnd",
        "activities": [{ "name": "Factorio" }],
    });
    let request = Request::post("/webhook/discord")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let (status, _, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"Webhook received");

    // the ingest task applies updates asynchronously
    for _ in 0..100 {
        if state.cache.presences.get_fresh(USER).is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let (_, body) = get_json(&app, &format!("/api/status/{USER}")).await;
    assert_eq!(body["status"], "dnd");

    let (_, body) = get_json(&app, &format!("/api/presence/{USER}")).await;
    assert_eq!(body["activities"][0]["name"], "Factorio");

    let (_, body) = get_json(&app, "/webhook-profile").await;
    assert_eq!(body, payload);
}

#[tokio::test]
async fn test_webhook_profile_starts_empty() {
    let app = app(test_state());

    let (status, body) = get_json(&app, "/webhook-profile").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_null());
}

#[tokio::test]
async fn test_static_pages() {
    let app = app(test_state());

    let request = Request::get("/").body(Body::empty()).unwrap();
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let request = Request::get("/profile").body(Body::empty()).unwrap();
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);

    let request = Request::get("/no/such/page").body(Body::empty()).unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(String::from_utf8_lossy(&body).contains("404"));
}

#[tokio::test]
async fn test_panic_is_redacted_in_production() {
    let (status, body) = get_json(&exploding_app(true), "/explode").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
    assert_eq!(body["message"], "Something went wrong");
}

#[tokio::test]
async fn test_panic_is_detailed_outside_production() {
    let app = exploding_app(false);

    let (status, body) = get_json(&app, "/explode").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Internal server error");
    assert_eq!(body["message"], "cache shard poisoned");

    // the server keeps answering after a handler panics
    let (status, _) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
}
