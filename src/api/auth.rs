//! Login, callback, status, and logout.

use axum::extract::{Query, State};
use axum::response::Redirect;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::SharedState;
use crate::error::GatewayError;

#[derive(Debug, Deserialize)]
pub(super) struct CallbackQuery {
    code: Option<String>,
    error: Option<String>,
}

/// GET /api/auth/login
pub(super) async fn login(State(state): State<SharedState>) -> Redirect {
    Redirect::temporary(&state.sessions.authorization_url(None))
}

/// GET /api/auth/callback
///
/// Exchanges the authorization code and reports the resolved user.
/// Identity failures are tolerated (the tokens are already saved); a
/// provider error or missing code is the caller's problem.
pub(super) async fn callback(
    State(state): State<SharedState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<Value>, GatewayError> {
    if let Some(error) = query.error {
        return Err(GatewayError::BadRequest(format!(
            "Google OAuth error: {error}"
        )));
    }
    let code = query
        .code
        .ok_or_else(|| GatewayError::BadRequest("no authorization code received".to_string()))?;

    let record = state.sessions.exchange_code(&code).await?;

    let user = match state.sessions.authenticated_client().await {
        Ok(client) => match state.sessions.resolve_identity(&client).await {
            Ok(user) => Some(user),
            Err(err) => {
                tracing::warn!(error = %err, "authenticated but identity resolution failed");
                None
            }
        },
        Err(_) => None,
    };

    Ok(Json(json!({
        "success": true,
        "message": "Authentication successful! Tokens saved.",
        "user": user,
        "scopes": record.scopes(),
    })))
}

/// GET /api/auth/status
pub(super) async fn status(State(state): State<SharedState>) -> Result<Json<Value>, GatewayError> {
    let status = state.sessions.session_status().await?;
    let authenticated = status.authenticated;
    let mut value = serde_json::to_value(&status)?;
    value["success"] = json!(true);
    if !authenticated {
        value["message"] = json!("Not authenticated. Visit /api/auth/login to authenticate.");
    }
    Ok(Json(value))
}

/// POST /api/auth/logout
pub(super) async fn logout(State(state): State<SharedState>) -> Result<Json<Value>, GatewayError> {
    state.sessions.revoke_session().await?;
    Ok(Json(json!({
        "success": true,
        "message": "Logged out and tokens revoked.",
    })))
}
