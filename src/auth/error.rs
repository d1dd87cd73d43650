use thiserror::Error;

/// Session and token-store errors.
///
/// `NotAuthenticated`, `SessionExpired`, and `NoRefreshToken` all mean the
/// same thing to the user (restart the authorization flow) and are
/// distinguished only for diagnostics.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no stored session; authenticate via /api/auth/login first")]
    NotAuthenticated,
    #[error("session expired after 3 months; re-authenticate via /api/auth/login")]
    SessionExpired,
    #[error("no refresh token on record; re-authenticate via /api/auth/login")]
    NoRefreshToken,
    #[error("authorization code exchange failed: {0}")]
    Exchange(String),
    #[error("access token refresh failed: {0}")]
    Refresh(String),
    #[error("token storage error: {0}")]
    Storage(String),
    #[error("identity resolution failed: {0}")]
    IdentityResolution(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(error: reqwest::Error) -> Self {
        Self::Network(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::InvalidResponse(error.to_string())
    }
}
