mod support;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use tycho::api::{router, AppState};
use tycho::auth::{MemoryTokenStore, TokenStore};
use tycho::config::{GatewayConfig, StorageBackend};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::record;

fn test_config() -> GatewayConfig {
    GatewayConfig {
        oauth: support::oauth_config(),
        storage_backend: StorageBackend::Memory,
        storage_key: "default".to_string(),
        token_file: std::path::PathBuf::from("unused.json"),
        ga4_property_id: Some("123456".to_string()),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
    }
}

fn app(server: &MockServer, store: Arc<MemoryTokenStore>) -> Router {
    let sessions = support::manager(server, store);
    router(Arc::new(AppState {
        config: test_config(),
        sessions,
    }))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(
        app,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await
}

#[tokio::test]
async fn status_reports_unauthenticated_without_record() {
    let server = MockServer::start().await;
    let app = app(&server, Arc::new(MemoryTokenStore::new()));

    let (status, body) = get(app, "/api/auth/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["authenticated"], json!(false));
    assert!(body["message"].as_str().unwrap().contains("/api/auth/login"));
}

#[tokio::test]
async fn status_reports_live_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth2/v2/userinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "108",
            "email": "ada@example.com",
            "name": "Ada"
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    store.save(&record("a1")).await.unwrap();
    let app = app(&server, store);

    let (status, body) = get(app, "/api/auth/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["authenticated"], json!(true));
    assert_eq!(body["tokenExpired"], json!(false));
    assert_eq!(body["sessionExpired"], json!(false));
    assert_eq!(body["hasRefreshToken"], json!(true));
    assert_eq!(body["user"]["email"], json!("ada@example.com"));
    assert_eq!(body["scopes"], json!(["openid", "email"]));
}

#[tokio::test]
async fn login_redirects_to_consent_screen() {
    let server = MockServer::start().await;
    let app = app(&server, Arc::new(MemoryTokenStore::new()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/login")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response.headers()[header::LOCATION].to_str().unwrap();
    assert!(location.contains("access_type=offline"));
    assert!(location.contains("prompt=consent"));
    assert!(location.contains("client_id=test-client"));
}

#[tokio::test]
async fn callback_reports_provider_error_as_bad_request() {
    let server = MockServer::start().await;
    let app = app(&server, Arc::new(MemoryTokenStore::new()));

    let (status, body) = get(app, "/api/auth/callback?error=access_denied").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("access_denied"));
}

#[tokio::test]
async fn callback_without_code_is_a_bad_request() {
    let server = MockServer::start().await;
    let app = app(&server, Arc::new(MemoryTokenStore::new()));

    let (status, body) = get(app, "/api/auth/callback").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn callback_exchanges_code_and_reports_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "a1",
            "refresh_token": "r1",
            "expires_in": 3600,
            "scope": "openid email",
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oauth2/v2/userinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "108",
            "email": "ada@example.com",
            "name": "Ada"
        })))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    let app = app(&server, store.clone());

    let (status, body) = get(app, "/api/auth/callback?code=auth-code-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["user"]["email"], json!("ada@example.com"));
    assert_eq!(body["scopes"], json!(["openid", "email"]));
    assert!(store.load().await.unwrap().is_some());
}

#[tokio::test]
async fn invalid_code_surfaces_as_upstream_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
        .mount(&server)
        .await;

    let app = app(&server, Arc::new(MemoryTokenStore::new()));

    let (status, body) = get(app, "/api/auth/callback?code=bad").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], json!(false));
}

#[tokio::test]
async fn logout_succeeds_with_nothing_stored() {
    let server = MockServer::start().await;
    let app = app(&server, Arc::new(MemoryTokenStore::new()));

    let (status, body) = send(
        app,
        Request::builder()
            .method("POST")
            .uri("/api/auth/logout")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
}

#[tokio::test]
async fn logout_clears_the_stored_session() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/revoke"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    store.save(&record("a1")).await.unwrap();
    let app = app(&server, store.clone());

    let (status, _body) = send(
        app,
        Request::builder()
            .method("POST")
            .uri("/api/auth/logout")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(store.load().await.unwrap().is_none());
}

#[tokio::test]
async fn api_routes_require_authentication() {
    let server = MockServer::start().await;
    let app = app(&server, Arc::new(MemoryTokenStore::new()));

    let (status, body) = get(app, "/api/gmail").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], json!(false));
    assert!(body["error"].as_str().unwrap().contains("authenticate"));
}
