#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tycho::auth::{
    AuthError, MemoryTokenStore, OAuthConfig, SessionManager, TokenRecord, TokenStore,
    SESSION_TTL_MS,
};
use wiremock::MockServer;

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn oauth_config() -> OAuthConfig {
    OAuthConfig {
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
        redirect_uri: "http://localhost:3000/api/auth/callback".to_string(),
    }
}

/// A live record: access token valid for an hour, session valid for the
/// full TTL.
pub fn record(access_token: &str) -> TokenRecord {
    let now = now_ms();
    TokenRecord {
        access_token: access_token.to_string(),
        refresh_token: Some("r1".to_string()),
        expiry_date: Some(now + 3_600_000),
        token_type: Some("Bearer".to_string()),
        scope: Some("openid email".to_string()),
        id_token: None,
        session_expiry: Some(now + SESSION_TTL_MS),
    }
}

/// A session manager with every Google endpoint pointed at the mock
/// server.
pub fn manager(server: &MockServer, store: Arc<dyn TokenStore>) -> SessionManager {
    SessionManager::new(oauth_config(), store)
        .with_auth_url(format!("{}/o/oauth2/v2/auth", server.uri()))
        .with_token_url(format!("{}/token", server.uri()))
        .with_revoke_url(format!("{}/revoke", server.uri()))
        .with_jwks_url(format!("{}/oauth2/v3/certs", server.uri()))
        .with_userinfo_url(format!("{}/oauth2/v2/userinfo", server.uri()))
}

/// Memory store that counts writes, for asserting "exactly one save".
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryTokenStore,
    saves: AtomicUsize,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenStore for CountingStore {
    async fn save(&self, record: &TokenRecord) -> Result<(), AuthError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save(record).await
    }

    async fn load(&self) -> Result<Option<TokenRecord>, AuthError> {
        self.inner.load().await
    }

    async fn delete(&self) -> Result<(), AuthError> {
        self.inner.delete().await
    }
}
