//! HTTP session provisioning
//!
//! `POST /api/sessions {name}` returns the created session (200 or 201);
//! `GET /api/sessions` lists the sessions the backend knows about.

use serde::Serialize;
use std::time::Duration;
use url::Url;

use crate::error::SessionError;
use crate::session::Session;
use crate::Result;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Clone)]
pub struct SessionApi {
    client: reqwest::Client,
    endpoint: Url,
}

impl SessionApi {
    /// `base` is the backend's HTTP origin, e.g. `http://127.0.0.1:8080`.
    pub fn new(base: &Url) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint: base.join("/api/sessions")?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub async fn create_session(&self, name: &str) -> Result<Session> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyName);
        }

        tracing::debug!(endpoint = %self.endpoint, name = %name, "Creating session");

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&CreateSessionRequest { name })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SessionError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        let mut session: Session =
            serde_json::from_str(&body).map_err(|_| SessionError::MissingId)?;
        if session.id.is_empty() {
            return Err(SessionError::MissingId);
        }
        if session.name.is_empty() {
            session.name = name.to_string();
        }

        tracing::info!(session_id = %session.id, name = %session.name, "Created session");

        Ok(session)
    }

    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        let response = self.client.get(self.endpoint.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json().await?)
    }
}
