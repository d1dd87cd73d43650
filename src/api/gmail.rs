//! Gmail routes.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::SharedState;
use crate::error::GatewayError;
use crate::google::gmail::{ListMessages, SendEmail};
use crate::google::GmailApi;

async fn gmail_api(state: &SharedState) -> Result<GmailApi, GatewayError> {
    let client = state.sessions.authenticated_client().await?;
    Ok(GmailApi::new(client))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ListQuery {
    q: Option<String>,
    max_results: Option<u32>,
    page_token: Option<String>,
    /// Comma-separated label IDs, e.g. `INBOX,UNREAD`.
    label_ids: Option<String>,
    /// `true` to return the mailbox profile instead of a listing.
    profile: Option<String>,
}

/// GET /api/gmail
pub(super) async fn list(
    State(state): State<SharedState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, GatewayError> {
    let gmail = gmail_api(&state).await?;

    if query.profile.as_deref() == Some("true") {
        let profile = gmail.profile().await?;
        return Ok(Json(json!({ "success": true, "data": profile })));
    }

    let params = ListMessages {
        query: query.q,
        max_results: query.max_results,
        page_token: query.page_token,
        label_ids: query
            .label_ids
            .map(|raw| raw.split(',').map(|v| v.trim().to_string()).collect())
            .unwrap_or_default(),
    };
    let result = gmail.list_messages(&params).await?;
    Ok(Json(json!({ "success": true, "data": result })))
}

/// POST /api/gmail
pub(super) async fn send(
    State(state): State<SharedState>,
    Json(body): Json<SendEmail>,
) -> Result<Json<Value>, GatewayError> {
    if body.to.is_empty() || body.subject.is_empty() || body.body.is_empty() {
        return Err(GatewayError::BadRequest(
            "missing required fields: to, subject, body".to_string(),
        ));
    }
    let gmail = gmail_api(&state).await?;
    let sent = gmail.send(&body).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Email sent successfully",
        "data": sent,
    })))
}

#[derive(Debug, Deserialize)]
pub(super) struct GetQuery {
    /// `message` (default) or `thread`.
    #[serde(rename = "type")]
    kind: Option<String>,
}

/// GET /api/gmail/{id}
pub(super) async fn get(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Query(query): Query<GetQuery>,
) -> Result<Json<Value>, GatewayError> {
    let gmail = gmail_api(&state).await?;
    let data = if query.kind.as_deref() == Some("thread") {
        serde_json::to_value(gmail.thread(&id).await?)?
    } else {
        serde_json::to_value(gmail.get_message(&id).await?)?
    };
    Ok(Json(json!({ "success": true, "data": data })))
}

#[derive(Debug, Deserialize)]
pub(super) struct UpdateBody {
    action: String,
}

/// PATCH /api/gmail/{id}
pub(super) async fn update(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateBody>,
) -> Result<Json<Value>, GatewayError> {
    if body.action != "markRead" {
        return Err(GatewayError::BadRequest(format!(
            "unknown action: {}",
            body.action
        )));
    }
    let gmail = gmail_api(&state).await?;
    gmail.mark_read(&id).await?;
    Ok(Json(json!({ "success": true, "message": "Marked as read" })))
}
