//! HTTP contract with the process supervisor and the agent.
//!
//! The supervisor serves `/status`, `/logs` and the control routes; the agent
//! serves `/agent/chat`. Both live behind the same base URL.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::error::ClientError;
use crate::model::{AgentReply, ChatRequest, Command, LogsPayload, StatusSnapshot};

/// Remote collaborators the console talks to.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn fetch_status(&self) -> Result<StatusSnapshot, ClientError>;

    async fn fetch_logs(&self) -> Result<Vec<String>, ClientError>;

    /// Sends one control command. The response body is ignored.
    async fn send_command(&self, command: Command) -> Result<(), ClientError>;

    async fn chat(&self, message: &str) -> Result<AgentReply, ClientError>;
}

pub struct HttpControlPlane {
    base_url: String,
    http: reqwest::Client,
}

impl HttpControlPlane {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(base_url.into()),
            http: reqwest::Client::new(),
        }
    }

    /// Builds a client with an optional request timeout. `None` keeps the
    /// transport default.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, ClientError> {
        let Some(timeout) = timeout else {
            return Ok(Self::new(base_url));
        };
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| ClientError::Network(err.to_string()))?;
        Ok(Self {
            base_url: normalize_base_url(base_url.into()),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.http.get(self.url(path)).send().await?;
        decode_json(response).await
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn fetch_status(&self) -> Result<StatusSnapshot, ClientError> {
        self.get_json("/status").await
    }

    async fn fetch_logs(&self) -> Result<Vec<String>, ClientError> {
        let payload: LogsPayload = self.get_json("/logs").await?;
        Ok(payload.logs)
    }

    async fn send_command(&self, command: Command) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url(&command.path()))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let status = response.status();
        debug!(event = "command_response", command = %command, status = status.as_u16());
        if !status.is_success() {
            return Err(ClientError::Rejected {
                status: status.as_u16(),
            });
        }
        Ok(())
    }

    async fn chat(&self, message: &str) -> Result<AgentReply, ClientError> {
        let request = ChatRequest {
            message: message.to_string(),
        };
        let response = self
            .http
            .post(self.url("/agent/chat"))
            .json(&request)
            .send()
            .await?;
        decode_json(response).await
    }
}

async fn decode_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Rejected {
            status: status.as_u16(),
        });
    }
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|err| ClientError::Decode(err.to_string()))
}

fn normalize_base_url(raw: String) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_drops_trailing_slashes() {
        let plane = HttpControlPlane::new(" http://localhost:8000// ");
        assert_eq!(plane.base_url(), "http://localhost:8000");
        assert_eq!(plane.url("/status"), "http://localhost:8000/status");
    }

    #[test]
    fn timeout_is_optional() {
        let plane = HttpControlPlane::with_timeout("http://127.0.0.1:9", None).expect("client");
        assert_eq!(plane.base_url(), "http://127.0.0.1:9");
        let plane =
            HttpControlPlane::with_timeout("http://127.0.0.1:9", Some(Duration::from_millis(250)))
                .expect("client");
        assert_eq!(plane.base_url(), "http://127.0.0.1:9");
    }
}
