//! HTTP transport: the only place that talks to the network.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use tasklane_core::error::{Result, TasklaneError};

use crate::request::{ApiRequest, ApiResponse, RequestBody};

/// Executes one request and returns whatever the backend answered.
///
/// Non-success statuses are returned as responses, not errors; an error
/// means no response was received.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| TasklaneError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let ApiRequest {
            method,
            path,
            query,
            mut headers,
            body,
        } = request;

        debug!(%method, path = %path, "Sending request");

        let mut builder = self.client.request(method, self.url(&path));
        if !query.is_empty() {
            builder = builder.query(&query);
        }

        builder = match body {
            RequestBody::Empty => builder.headers(headers),
            RequestBody::Json(value) => builder.headers(headers).json(&value),
            RequestBody::Multipart(parts) => {
                // reqwest sets the boundary-carrying content type itself
                headers.remove(CONTENT_TYPE);
                let mut form = reqwest::multipart::Form::new();
                for part in parts {
                    let file = reqwest::multipart::Part::bytes(part.bytes)
                        .file_name(part.file_name)
                        .mime_str(&part.mime)
                        .map_err(|e| TasklaneError::Transport(e.to_string()))?;
                    form = form.part(part.field, file);
                }
                builder.headers(headers).multipart(form)
            }
        };

        let resp = builder
            .send()
            .await
            .map_err(|e| TasklaneError::Transport(e.to_string()))?;

        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp
            .bytes()
            .await
            .map_err(|e| TasklaneError::Transport(e.to_string()))?;

        debug!(path = %path, status = status.as_u16(), bytes = body.len(), "Received response");

        Ok(ApiResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}
