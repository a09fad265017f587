//! In-memory transport used by the unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use tokio::sync::Notify;

use tasklane_core::error::{Result, TasklaneError};

use crate::request::{ApiRequest, ApiResponse, RequestBody};
use crate::transport::Transport;

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: RequestBody,
}

enum Scripted {
    Reply(StatusCode, Vec<u8>),
    Fail(String),
}

/// Replies per path; unscripted paths answer `200 {}`.
pub struct FakeTransport {
    scripts: Mutex<HashMap<String, Scripted>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    requests: Mutex<Vec<Recorded>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(&self, path: &str, status: StatusCode, body: serde_json::Value) {
        self.scripts.lock().unwrap().insert(
            path.to_string(),
            Scripted::Reply(status, body.to_string().into_bytes()),
        );
    }

    pub fn respond_raw(&self, path: &str, status: StatusCode, body: &[u8]) {
        self.scripts
            .lock()
            .unwrap()
            .insert(path.to_string(), Scripted::Reply(status, body.to_vec()));
    }

    /// Make requests to `path` fail without a response.
    pub fn fail(&self, path: &str, reason: &str) {
        self.scripts
            .lock()
            .unwrap()
            .insert(path.to_string(), Scripted::Fail(reason.to_string()));
    }

    /// Hold requests to `path` until the returned notifier fires.
    pub fn gate(&self, path: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(path.to_string(), notify.clone());
        notify
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .count()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let header = |name: reqwest::header::HeaderName| {
            request
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };
        self.requests.lock().unwrap().push(Recorded {
            method: request.method.clone(),
            path: request.path.clone(),
            query: request.query.clone(),
            authorization: header(AUTHORIZATION),
            content_type: header(CONTENT_TYPE),
            body: request.body.clone(),
        });

        let gate = self.gates.lock().unwrap().get(&request.path).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        match self.scripts.lock().unwrap().get(&request.path) {
            Some(Scripted::Reply(status, body)) => Ok(ApiResponse::new(*status, body.clone())),
            Some(Scripted::Fail(reason)) => Err(TasklaneError::Transport(reason.clone())),
            None => Ok(ApiResponse::new(StatusCode::OK, "{}")),
        }
    }
}
