//! HTTP backend.
//!
//! Each side effect is a `POST <base>/<effect>` with the [`BackendRequest`]
//! as its JSON body.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use super::backend::{Backend, BackendRequest, BackendResponse};
use crate::flow::ExternalError;

/// Talks to a backend service over HTTP.
pub struct HttpBackend {
    client: Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpBackend {
    /// Create a backend with a 30-second client timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    /// Create a backend with a custom client timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("waypost/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            timeout,
        })
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn endpoint(&self, effect: &str) -> String {
        format!("{}/{}", self.base_url, effect)
    }

    fn classify(&self, err: reqwest::Error) -> ExternalError {
        if err.is_timeout() {
            ExternalError::Timeout {
                after: self.timeout,
            }
        } else {
            ExternalError::Network {
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn call(&self, request: &BackendRequest) -> Result<BackendResponse, ExternalError> {
        let url = self.endpoint(&request.effect);
        tracing::debug!("POST {}", url);

        let mut builder = self.client.post(&url).json(request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        // Error statuses may still carry a collaborator answer.
        match serde_json::from_slice::<BackendResponse>(&body) {
            Ok(answer) => Ok(answer),
            Err(_) if !status.is_success() => Err(ExternalError::Network {
                message: format!("HTTP {} from {}", status, url),
            }),
            Err(e) => Err(ExternalError::Network {
                message: format!("invalid response from {}: {}", url, e),
            }),
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}
