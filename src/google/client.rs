use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::error::GatewayError;

/// Request-scoped client carrying the session's current credentials.
///
/// Constructed fresh by `SessionManager::authenticated_client` for each
/// operation; holds no lifecycle state of its own.
#[derive(Debug, Clone)]
pub struct AuthorizedClient {
    http: reqwest::Client,
    access_token: String,
    id_token: Option<String>,
}

impl AuthorizedClient {
    pub fn new(http: reqwest::Client, access_token: String, id_token: Option<String>) -> Self {
        Self {
            http,
            access_token,
            id_token,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn id_token(&self) -> Option<&str> {
        self.id_token.as_deref()
    }

    pub fn get(&self, url: impl reqwest::IntoUrl) -> RequestBuilder {
        self.http.get(url).bearer_auth(&self.access_token)
    }

    pub fn post(&self, url: impl reqwest::IntoUrl) -> RequestBuilder {
        self.http.post(url).bearer_auth(&self.access_token)
    }

    pub fn put(&self, url: impl reqwest::IntoUrl) -> RequestBuilder {
        self.http.put(url).bearer_auth(&self.access_token)
    }

    pub fn delete(&self, url: impl reqwest::IntoUrl) -> RequestBuilder {
        self.http.delete(url).bearer_auth(&self.access_token)
    }
}

/// Decode a JSON body after checking the upstream status.
pub(crate) async fn expect_json<T: DeserializeOwned>(resp: Response) -> Result<T, GatewayError> {
    let resp = expect_success(resp).await?;
    Ok(resp.json().await?)
}

/// Check the upstream status, discarding the body.
pub(crate) async fn expect_empty(resp: Response) -> Result<(), GatewayError> {
    expect_success(resp).await.map(|_| ())
}

async fn expect_success(resp: Response) -> Result<Response, GatewayError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(GatewayError::Upstream {
        status: status.as_u16(),
        message,
    })
}
