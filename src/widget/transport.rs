//! Mutation requests from the controller to the server.
//!
//! ERROR HANDLING
//! ==============
//! Anything other than a 2xx response carrying `{"status":"ok"}` is a
//! failure. Authentication and permission failures come back as plain-text
//! host errors, so the body is kept verbatim in [`TransportError::Status`]
//! rather than parsed.

use reqwest::header::COOKIE;
use serde::Deserialize;

use crate::routes::{SESSION_COOKIE, TOGGLE_PATH, state_path};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response body: {0}")]
    UnexpectedBody(String),
}

/// Sends the new flag value for a course. Enables mocking in tests.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Ask the server to store `active` for `course_id`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the request fails or the server rejects it.
    async fn set_state(&self, course_id: i64, active: bool) -> Result<(), TransportError>;
}

#[derive(Deserialize)]
struct MutationAck {
    status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RemoteFlag {
    pub course_id: i64,
    pub enabled: bool,
}

/// HTTP transport posting URL-encoded forms to the toggle endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    wwwroot: String,
    session_token: Option<String>,
}

impl HttpTransport {
    #[must_use]
    pub fn new(wwwroot: &str) -> Self {
        Self { client: reqwest::Client::new(), wwwroot: wwwroot.trim_end_matches('/').to_owned(), session_token: None }
    }

    /// Attach a session cookie to every request.
    #[must_use]
    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.session_token {
            Some(token) => request.header(COOKIE, format!("{SESSION_COOKIE}={token}")),
            None => request,
        }
    }

    /// Read the stored flag through the state query endpoint.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the request fails or the server rejects it.
    pub async fn fetch_state(&self, course_id: i64) -> Result<RemoteFlag, TransportError> {
        let url = format!("{}{}", self.wwwroot, state_path(course_id));
        let response = self.authorized(self.client.get(url)).send().await?;
        let response = ensure_success(response).await?;
        Ok(response.json::<RemoteFlag>().await?)
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn set_state(&self, course_id: i64, active: bool) -> Result<(), TransportError> {
        let url = format!("{}{TOGGLE_PATH}", self.wwwroot);
        let form = [("courseid", course_id.to_string()), ("state", u8::from(active).to_string())];
        let response = self.authorized(self.client.post(url)).form(&form).send().await?;
        let response = ensure_success(response).await?;

        let body = response.text().await?;
        match serde_json::from_str::<MutationAck>(&body) {
            Ok(ack) if ack.status == "ok" => Ok(()),
            _ => Err(TransportError::UnexpectedBody(body)),
        }
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TransportError::Status { status: status.as_u16(), body })
}
