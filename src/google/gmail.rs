//! Gmail pass-through: list, read, send, threads, labels, profile.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::client::{expect_empty, expect_json, AuthorizedClient};
use crate::error::GatewayError;

pub const GMAIL_BASE_URL: &str = "https://gmail.googleapis.com/gmail/v1";

/// A message reshaped for the gateway's callers: headers flattened, body
/// decoded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessage {
    pub id: String,
    pub thread_id: String,
    pub snippet: String,
    pub subject: String,
    pub from: String,
    pub to: String,
    pub date: String,
    pub body: String,
    pub label_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageList {
    pub messages: Vec<GmailMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    pub result_size_estimate: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    pub id: String,
    pub thread_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailProfile {
    #[serde(default)]
    pub email_address: String,
    #[serde(default)]
    pub messages_total: u64,
    #[serde(default)]
    pub threads_total: u64,
}

/// Outbound mail parameters, as posted to the send route.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub is_html: bool,
    #[serde(default)]
    pub cc: Option<String>,
    #[serde(default)]
    pub bcc: Option<String>,
}

/// List-messages parameters.
#[derive(Debug, Clone, Default)]
pub struct ListMessages {
    pub query: Option<String>,
    pub max_results: Option<u32>,
    pub page_token: Option<String>,
    pub label_ids: Vec<String>,
}

// Wire shapes from the Gmail API.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageRefList {
    #[serde(default)]
    messages: Vec<MessageRef>,
    next_page_token: Option<String>,
    #[serde(default)]
    result_size_estimate: u64,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessage {
    #[serde(default)]
    id: String,
    #[serde(default)]
    thread_id: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    label_ids: Vec<String>,
    payload: Option<MessagePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagePart {
    #[serde(default)]
    headers: Vec<Header>,
    body: Option<PartBody>,
    #[serde(default)]
    parts: Vec<MessagePart>,
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: Option<String>,
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PartBody {
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadResponse {
    #[serde(default)]
    messages: Vec<RawMessage>,
}

/// Gmail API wrapper over an authenticated client.
pub struct GmailApi {
    client: AuthorizedClient,
    base_url: String,
}

impl GmailApi {
    pub fn new(client: AuthorizedClient) -> Self {
        Self {
            client,
            base_url: GMAIL_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// List messages matching the query, hydrating each reference with the
    /// full message.
    pub async fn list_messages(&self, params: &ListMessages) -> Result<MessageList, GatewayError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(q) = &params.query {
            query.push(("q", q.clone()));
        }
        query.push(("maxResults", params.max_results.unwrap_or(10).to_string()));
        if let Some(token) = &params.page_token {
            query.push(("pageToken", token.clone()));
        }
        for label in &params.label_ids {
            query.push(("labelIds", label.clone()));
        }

        let resp = self
            .client
            .get(format!("{}/users/me/messages", self.base_url))
            .query(&query)
            .send()
            .await?;
        let refs: MessageRefList = expect_json(resp).await?;

        let mut messages = Vec::with_capacity(refs.messages.len());
        for reference in &refs.messages {
            messages.push(self.get_message(&reference.id).await?);
        }

        Ok(MessageList {
            messages,
            next_page_token: refs.next_page_token,
            result_size_estimate: refs.result_size_estimate,
        })
    }

    pub async fn get_message(&self, id: &str) -> Result<GmailMessage, GatewayError> {
        let resp = self
            .client
            .get(format!("{}/users/me/messages/{id}", self.base_url))
            .query(&[("format", "full")])
            .send()
            .await?;
        let raw: RawMessage = expect_json(resp).await?;
        Ok(parse_message(raw))
    }

    pub async fn send(&self, mail: &SendEmail) -> Result<SentMessage, GatewayError> {
        let raw = URL_SAFE_NO_PAD.encode(build_raw(mail));
        let resp = self
            .client
            .post(format!("{}/users/me/messages/send", self.base_url))
            .json(&serde_json::json!({ "raw": raw }))
            .send()
            .await?;
        let sent: RawMessage = expect_json(resp).await?;
        Ok(SentMessage {
            id: sent.id,
            thread_id: sent.thread_id,
        })
    }

    pub async fn thread(&self, id: &str) -> Result<Vec<GmailMessage>, GatewayError> {
        let resp = self
            .client
            .get(format!("{}/users/me/threads/{id}", self.base_url))
            .query(&[("format", "full")])
            .send()
            .await?;
        let thread: ThreadResponse = expect_json(resp).await?;
        Ok(thread.messages.into_iter().map(parse_message).collect())
    }

    /// Drop the `UNREAD` label.
    pub async fn mark_read(&self, id: &str) -> Result<(), GatewayError> {
        let resp = self
            .client
            .post(format!("{}/users/me/messages/{id}/modify", self.base_url))
            .json(&serde_json::json!({ "removeLabelIds": ["UNREAD"] }))
            .send()
            .await?;
        expect_empty(resp).await
    }

    pub async fn profile(&self) -> Result<GmailProfile, GatewayError> {
        let resp = self
            .client
            .get(format!("{}/users/me/profile", self.base_url))
            .send()
            .await?;
        expect_json(resp).await
    }
}

fn parse_message(raw: RawMessage) -> GmailMessage {
    let headers = raw
        .payload
        .as_ref()
        .map(|p| p.headers.as_slice())
        .unwrap_or_default();
    GmailMessage {
        subject: header_value(headers, "subject"),
        from: header_value(headers, "from"),
        to: header_value(headers, "to"),
        date: header_value(headers, "date"),
        body: raw.payload.as_ref().map(extract_body).unwrap_or_default(),
        id: raw.id,
        thread_id: raw.thread_id,
        snippet: raw.snippet,
        label_ids: raw.label_ids,
    }
}

fn header_value(headers: &[Header], name: &str) -> String {
    headers
        .iter()
        .find(|h| {
            h.name
                .as_deref()
                .is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
        .and_then(|h| h.value.clone())
        .unwrap_or_default()
}

/// Body from the top-level payload, else the first HTML part, else the
/// first plain-text part.
fn extract_body(payload: &MessagePart) -> String {
    if let Some(data) = payload.body.as_ref().and_then(|b| b.data.as_deref()) {
        return decode_body(data);
    }
    let part = payload
        .parts
        .iter()
        .find(|p| p.mime_type.as_deref() == Some("text/html"))
        .or_else(|| {
            payload
                .parts
                .iter()
                .find(|p| p.mime_type.as_deref() == Some("text/plain"))
        });
    part.and_then(|p| p.body.as_ref())
        .and_then(|b| b.data.as_deref())
        .map(decode_body)
        .unwrap_or_default()
}

fn decode_body(data: &str) -> String {
    URL_SAFE_NO_PAD
        .decode(data.trim_end_matches('='))
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Assemble the RFC 2822 message Gmail expects in `raw`.
fn build_raw(mail: &SendEmail) -> String {
    let content_type = if mail.is_html {
        "text/html"
    } else {
        "text/plain"
    };
    let mut lines = vec![format!("To: {}", mail.to)];
    if let Some(cc) = &mail.cc {
        lines.push(format!("Cc: {cc}"));
    }
    if let Some(bcc) = &mail.bcc {
        lines.push(format!("Bcc: {bcc}"));
    }
    lines.push(format!("Subject: {}", mail.subject));
    lines.push(format!("Content-Type: {content_type}; charset=utf-8"));
    lines.push(String::new());
    lines.push(mail.body.clone());
    lines.join("\r\n")
}
