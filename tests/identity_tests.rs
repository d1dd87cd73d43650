mod support;

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::json;
use tycho::auth::{AuthError, MemoryTokenStore, TokenStore};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use support::{manager, record};

/// Structurally valid but unverifiable JWT: real header and payload, junk
/// signature.
fn fake_jwt(kid: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(json!({ "alg": "RS256", "kid": kid }).to_string());
    let payload = URL_SAFE_NO_PAD.encode(
        json!({
            "iss": "https://accounts.google.com",
            "sub": "108",
            "aud": "test-client",
            "exp": 4_102_444_800i64
        })
        .to_string(),
    );
    format!("{header}.{payload}.bm90LWEtc2lnbmF0dXJl")
}

#[tokio::test]
async fn unverifiable_id_token_falls_back_to_userinfo() {
    let server = MockServer::start().await;
    // JWKS advertises no usable key for the kid, so verification dead-ends
    // and the bearer-token path takes over.
    Mock::given(method("GET"))
        .and(path("/oauth2/v3/certs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": [] })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oauth2/v2/userinfo"))
        .and(header("authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "108",
            "email": "ada@example.com",
            "name": "Ada"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut with_id_token = record("a1");
    with_id_token.id_token = Some(fake_jwt("kid-1"));

    let store = Arc::new(MemoryTokenStore::new());
    store.save(&with_id_token).await.unwrap();
    let sessions = manager(&server, store);

    let client = sessions.authenticated_client().await.expect("client");
    let user = sessions.resolve_identity(&client).await.expect("identity");
    assert_eq!(user.id, "108");
    assert_eq!(user.email, "ada@example.com");
    assert_eq!(user.name, "Ada");
    server.verify().await;
}

#[tokio::test]
async fn garbage_id_token_skips_jwks_and_uses_userinfo() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth2/v3/certs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": [] })))
        .expect(0)
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

    let mut with_id_token = record("a1");
    with_id_token.id_token = Some("not-a-jwt".to_string());

    let store = Arc::new(MemoryTokenStore::new());
    store.save(&with_id_token).await.unwrap();
    let sessions = manager(&server, store);

    let client = sessions.authenticated_client().await.expect("client");
    let user = sessions.resolve_identity(&client).await.expect("identity");
    assert_eq!(user.email, "ada@example.com");
    server.verify().await;
}

#[tokio::test]
async fn missing_id_token_goes_straight_to_userinfo() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth2/v2/userinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "108",
            "email": "ada@example.com",
            "name": "Ada",
            "picture": "https://example.com/ada.png"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryTokenStore::new());
    store.save(&record("a1")).await.unwrap();
    let sessions = manager(&server, store);

    let client = sessions.authenticated_client().await.expect("client");
    let user = sessions.resolve_identity(&client).await.expect("identity");
    assert_eq!(user.picture.as_deref(), Some("https://example.com/ada.png"));
}

#[tokio::test]
async fn both_paths_failing_is_an_identity_resolution_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/oauth2/v3/certs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": [] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oauth2/v2/userinfo"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mut with_id_token = record("a1");
    with_id_token.id_token = Some(fake_jwt("kid-1"));

    let store = Arc::new(MemoryTokenStore::new());
    store.save(&with_id_token).await.unwrap();
    let sessions = manager(&server, store);

    let client = sessions.authenticated_client().await.expect("client");
    let result = sessions.resolve_identity(&client).await;
    assert!(matches!(result, Err(AuthError::IdentityResolution(_))));
}
