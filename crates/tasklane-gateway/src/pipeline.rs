//! Request pipeline: a transport wrapped in an ordered middleware chain.
//!
//! Requests pass every middleware's `on_request` in registration order, then
//! the transport. Non-success replies are turned into
//! [`TasklaneError::Api`](tasklane_core::error::TasklaneError::Api), and the
//! result passes every middleware's `on_response` in the same order.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use tasklane_core::error::Result;

use crate::request::{ApiRequest, ApiResponse};
use crate::transport::Transport;

#[async_trait]
pub trait Middleware: Send + Sync {
    fn name(&self) -> &str;

    async fn on_request(&self, request: ApiRequest) -> Result<ApiRequest> {
        Ok(request)
    }

    async fn on_response(&self, result: Result<ApiResponse>) -> Result<ApiResponse> {
        result
    }
}

/// Constructed once and shared by every caller; cloning is cheap.
#[derive(Clone)]
pub struct Pipeline {
    transport: Arc<dyn Transport>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            middleware: Vec::new(),
        }
    }

    /// Append a middleware to the end of the chain.
    pub fn with(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn middleware_names(&self) -> Vec<&str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }

    /// Send one request. A single attempt; no retries.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut request = request;
        for middleware in &self.middleware {
            request = middleware.on_request(request).await?;
        }

        let path = request.path.clone();
        let mut result = self
            .transport
            .execute(request)
            .await
            .and_then(ApiResponse::error_for_status);

        for middleware in &self.middleware {
            result = middleware.on_response(result).await;
        }

        if let Err(e) = &result {
            debug!(path = %path, error = %e, "Request failed");
        }
        result
    }
}
