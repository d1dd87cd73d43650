//! Who is behind the session.
//!
//! Primary path verifies the provider-signed `id_token` against Google's
//! published JWKS keys; anything short of a clean verification falls back
//! to the `userinfo` endpoint with the bearer access token.

use std::time::{Duration, Instant};

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::error::AuthError;

pub const GOOGLE_JWKS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
pub const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

const JWKS_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Human-readable identity resolved for the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
struct JwksResponse {
    keys: Vec<JwkKey>,
}

#[derive(Debug, Deserialize, Clone)]
struct JwkKey {
    kid: String,
    kty: String,
    /// RSA modulus.
    n: String,
    /// RSA exponent.
    e: String,
}

struct JwksCache {
    keys: Vec<JwkKey>,
    fetched_at: Instant,
}

/// Resolves [`UserInfo`] from an `id_token` or, failing that, the
/// `userinfo` endpoint. JWKS keys are cached for an hour.
pub struct IdentityResolver {
    http: reqwest::Client,
    audience: String,
    jwks_url: String,
    userinfo_url: String,
    cache: RwLock<Option<JwksCache>>,
}

impl IdentityResolver {
    pub fn new(http: reqwest::Client, audience: impl Into<String>) -> Self {
        Self {
            http,
            audience: audience.into(),
            jwks_url: GOOGLE_JWKS_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
            cache: RwLock::new(None),
        }
    }

    pub fn with_jwks_url(mut self, url: impl Into<String>) -> Self {
        self.jwks_url = url.into();
        self
    }

    pub fn with_userinfo_url(mut self, url: impl Into<String>) -> Self {
        self.userinfo_url = url.into();
        self
    }

    /// Resolve the identity behind a set of credentials.
    ///
    /// Fails with [`AuthError::IdentityResolution`] only when both the
    /// id_token path and the userinfo fallback fail.
    pub async fn resolve(
        &self,
        access_token: &str,
        id_token: Option<&str>,
    ) -> Result<UserInfo, AuthError> {
        if let Some(raw) = id_token {
            match self.verify_id_token(raw).await {
                Ok(user) => return Ok(user),
                Err(err) => {
                    tracing::debug!(error = %err, "id_token verification failed; trying userinfo")
                }
            }
        }
        self.fetch_userinfo(access_token)
            .await
            .map_err(|err| AuthError::IdentityResolution(err.to_string()))
    }

    async fn verify_id_token(&self, raw: &str) -> Result<UserInfo, AuthError> {
        let header = decode_header(raw)
            .map_err(|err| AuthError::InvalidResponse(format!("bad id_token header: {err}")))?;
        let kid = header
            .kid
            .ok_or_else(|| AuthError::InvalidResponse("id_token header has no kid".to_string()))?;
        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_issuer(&["https://accounts.google.com", "accounts.google.com"]);

        let data = decode::<IdClaims>(raw, &key, &validation)
            .map_err(|err| AuthError::InvalidResponse(format!("id_token rejected: {err}")))?;
        Ok(UserInfo {
            id: data.claims.sub,
            email: data.claims.email.unwrap_or_default(),
            name: data.claims.name.unwrap_or_default(),
            picture: data.claims.picture,
        })
    }

    async fn fetch_userinfo(&self, access_token: &str) -> Result<UserInfo, AuthError> {
        let resp = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(AuthError::InvalidResponse(format!(
                "userinfo request failed with status {}",
                resp.status()
            )));
        }
        Ok(resp.json().await?)
    }

    /// Decoding key for a kid, refreshing the JWKS cache when it is stale
    /// or the kid is unknown.
    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, AuthError> {
        {
            let cache = self.cache.read().await;
            if let Some(ref cached) = *cache {
                if cached.fetched_at.elapsed() < JWKS_CACHE_TTL {
                    if let Some(key) = cached.keys.iter().find(|k| k.kid == kid) {
                        return jwk_to_decoding_key(key);
                    }
                }
            }
        }

        self.refresh_keys().await?;

        let cache = self.cache.read().await;
        if let Some(ref cached) = *cache {
            if let Some(key) = cached.keys.iter().find(|k| k.kid == kid) {
                return jwk_to_decoding_key(key);
            }
        }
        Err(AuthError::InvalidResponse(format!(
            "no JWKS key found for kid {kid}"
        )))
    }

    async fn refresh_keys(&self) -> Result<(), AuthError> {
        tracing::debug!(url = %self.jwks_url, "fetching JWKS keys");
        let resp = self.http.get(&self.jwks_url).send().await?;
        if !resp.status().is_success() {
            return Err(AuthError::InvalidResponse(format!(
                "JWKS request failed with status {}",
                resp.status()
            )));
        }
        let jwks: JwksResponse = resp.json().await?;

        let mut cache = self.cache.write().await;
        *cache = Some(JwksCache {
            keys: jwks.keys,
            fetched_at: Instant::now(),
        });
        Ok(())
    }
}

fn jwk_to_decoding_key(key: &JwkKey) -> Result<DecodingKey, AuthError> {
    if key.kty != "RSA" {
        return Err(AuthError::InvalidResponse(format!(
            "unsupported JWKS key type {}",
            key.kty
        )));
    }
    DecodingKey::from_rsa_components(&key.n, &key.e)
        .map_err(|err| AuthError::InvalidResponse(format!("invalid RSA key components: {err}")))
}
