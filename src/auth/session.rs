//! The OAuth session lifecycle.
//!
//! One `SessionManager` owns one Google identity: it builds the consent
//! URL, exchanges the authorization code, hands out request-scoped
//! authenticated clients (refreshing the access token lazily), and tears
//! the session down on logout.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthError;
use super::identity::{IdentityResolver, UserInfo};
use super::store::TokenStore;
use super::token::{now_ms, TokenRecord, SESSION_TTL_MS};
use crate::google::client::AuthorizedClient;

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";

/// Scopes requested on every consent screen.
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/gmail.send",
    "https://www.googleapis.com/auth/gmail.modify",
    "https://www.googleapis.com/auth/calendar",
    "https://www.googleapis.com/auth/calendar.events",
    "https://www.googleapis.com/auth/analytics.readonly",
    "openid",
    "email",
    "profile",
];

/// OAuth client registration, fixed at process start.
#[derive(Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"..")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// Snapshot of the session for the `status` route.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub authenticated: bool,
    pub token_expired: bool,
    pub session_expired: bool,
    pub has_refresh_token: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_expires_at: Option<String>,
    pub user: Option<UserInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
}

impl SessionStatus {
    fn unauthenticated() -> Self {
        Self {
            authenticated: false,
            token_expired: false,
            session_expired: false,
            has_refresh_token: false,
            session_expires_at: None,
            user: None,
            scopes: None,
        }
    }
}

/// Token endpoint payload, for both code exchange and refresh.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Access-token lifetime in seconds.
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

impl TokenResponse {
    fn into_record(self, now: i64) -> TokenRecord {
        TokenRecord {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expiry_date: self.expires_in.map(|secs| now + secs * 1_000),
            token_type: self.token_type,
            scope: self.scope,
            id_token: self.id_token,
            session_expiry: None,
        }
    }
}

/// Orchestrates the authorization-code flow and access-token lifecycle for
/// the single configured identity, persisting through a [`TokenStore`].
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use tycho::auth::{MemoryTokenStore, OAuthConfig, SessionManager};
///
/// let config = OAuthConfig {
///     client_id: "client-id".to_string(),
///     client_secret: "client-secret".to_string(),
///     redirect_uri: "http://localhost:3000/api/auth/callback".to_string(),
/// };
/// let sessions = SessionManager::new(config, Arc::new(MemoryTokenStore::new()));
/// let url = sessions.authorization_url(None);
/// ```
pub struct SessionManager {
    http: reqwest::Client,
    config: OAuthConfig,
    store: Arc<dyn TokenStore>,
    identity: IdentityResolver,
    auth_url: String,
    token_url: String,
    revoke_url: String,
}

impl SessionManager {
    pub fn new(config: OAuthConfig, store: Arc<dyn TokenStore>) -> Self {
        let http = reqwest::Client::new();
        let identity = IdentityResolver::new(http.clone(), config.client_id.clone());
        Self {
            http,
            config,
            store,
            identity,
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            revoke_url: GOOGLE_REVOKE_URL.to_string(),
        }
    }

    pub fn with_auth_url(mut self, url: impl Into<String>) -> Self {
        self.auth_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_revoke_url(mut self, url: impl Into<String>) -> Self {
        self.revoke_url = url.into();
        self
    }

    pub fn with_jwks_url(mut self, url: impl Into<String>) -> Self {
        self.identity = self.identity.with_jwks_url(url);
        self
    }

    pub fn with_userinfo_url(mut self, url: impl Into<String>) -> Self {
        self.identity = self.identity.with_userinfo_url(url);
        self
    }

    /// Consent-screen URL. Requests offline access and forces the consent
    /// prompt so Google re-issues a refresh token even on repeat
    /// authorization. Pure function of configuration.
    pub fn authorization_url(&self, state: Option<&str>) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &SCOPES.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent")
            .append_pair("state", state.unwrap_or("default"))
            .finish();
        format!("{}?{query}", self.auth_url)
    }

    /// Exchange a one-time authorization code for a token set, stamp the
    /// session boundary, and persist the result (full overwrite).
    ///
    /// Nothing is written when the provider rejects the code.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenRecord, AuthError> {
        let resp = self
            .http
            .post(&self.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Exchange(format!("status {status}: {body}")));
        }
        let payload: TokenResponse = resp
            .json()
            .await
            .map_err(|err| AuthError::InvalidResponse(err.to_string()))?;

        let now = now_ms();
        let mut record = payload.into_record(now);
        record.session_expiry = Some(now + SESSION_TTL_MS);
        self.store.save(&record).await?;
        tracing::info!(
            has_refresh_token = record.refresh_token.is_some(),
            "authorization code exchanged"
        );
        Ok(record)
    }

    /// The core read path: load, validate session and token expiry,
    /// refresh if stale, and hand back a ready-to-use client.
    ///
    /// Performs at most one provider call (the refresh) and at most one
    /// store write per invocation.
    pub async fn authenticated_client(&self) -> Result<AuthorizedClient, AuthError> {
        let record = self
            .store
            .load()
            .await?
            .ok_or(AuthError::NotAuthenticated)?;

        let now = now_ms();
        if record.session_expired(now) {
            return Err(AuthError::SessionExpired);
        }
        let refresh_token = record
            .refresh_token
            .clone()
            .ok_or(AuthError::NoRefreshToken)?;

        let record = if record.access_expired(now) {
            let fresh = self.refresh_access_token(&refresh_token).await?;
            let merged = record.merged_with(fresh);
            self.store.save(&merged).await?;
            tracing::debug!("access token refreshed");
            merged
        } else {
            record
        };

        Ok(AuthorizedClient::new(
            self.http.clone(),
            record.access_token,
            record.id_token,
        ))
    }

    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenRecord, AuthError> {
        let resp = self
            .http
            .post(&self.token_url)
            .form(&[
                ("refresh_token", refresh_token),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Refresh(format!("status {status}: {body}")));
        }
        let payload: TokenResponse = resp
            .json()
            .await
            .map_err(|err| AuthError::InvalidResponse(err.to_string()))?;
        Ok(payload.into_record(now_ms()))
    }

    /// Best-effort provider-side revocation, then unconditional local
    /// deletion. Revocation failures are logged and swallowed; only a
    /// failed deletion surfaces as an error.
    pub async fn revoke_session(&self) -> Result<(), AuthError> {
        match self.store.load().await {
            Ok(Some(record)) => {
                let result = self
                    .http
                    .post(&self.revoke_url)
                    .form(&[("token", record.access_token.as_str())])
                    .send()
                    .await;
                match result {
                    Ok(resp) if !resp.status().is_success() => {
                        tracing::warn!(status = %resp.status(), "token revocation rejected; clearing local session anyway");
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "token revocation failed; clearing local session anyway");
                    }
                    Ok(_) => {}
                }
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, "could not load record before revocation; clearing local session anyway");
            }
        }
        self.store.delete().await
    }

    /// Resolve the identity behind an authenticated client.
    pub async fn resolve_identity(&self, client: &AuthorizedClient) -> Result<UserInfo, AuthError> {
        self.identity
            .resolve(client.access_token(), client.id_token())
            .await
    }

    /// Session snapshot for the `status` route. Identity is resolved
    /// best-effort: failures leave `user` as `None` rather than failing
    /// the report.
    pub async fn session_status(&self) -> Result<SessionStatus, AuthError> {
        let Some(record) = self.store.load().await? else {
            return Ok(SessionStatus::unauthenticated());
        };

        let now = now_ms();
        let token_expired = record.access_expired(now);
        let session_expired = record.session_expired(now);

        let mut user = None;
        if !token_expired || record.refresh_token.is_some() {
            match self.authenticated_client().await {
                Ok(client) => user = self.resolve_identity(&client).await.ok(),
                Err(err) => {
                    tracing::debug!(error = %err, "skipping identity for status report")
                }
            }
        }

        Ok(SessionStatus {
            authenticated: true,
            token_expired,
            session_expired,
            has_refresh_token: record.refresh_token.is_some(),
            session_expires_at: record.session_expiry.and_then(|ms| {
                DateTime::<Utc>::from_timestamp_millis(ms).map(|dt| dt.to_rfc3339())
            }),
            user,
            scopes: record.scopes(),
        })
    }
}
