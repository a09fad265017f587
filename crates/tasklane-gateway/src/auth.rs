//! Bearer-token attachment.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};

use tasklane_core::error::{Result, TasklaneError};
use tasklane_core::session::SessionProvider;

use crate::pipeline::Middleware;
use crate::request::ApiRequest;

/// Attaches the stored token as `Authorization: Bearer <token>` and marks
/// the body as JSON. Multipart bodies keep the transport's content type.
pub struct BearerAuth {
    session: SessionProvider,
}

impl BearerAuth {
    pub fn new(session: SessionProvider) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Middleware for BearerAuth {
    fn name(&self) -> &str {
        "bearer_auth"
    }

    async fn on_request(&self, mut request: ApiRequest) -> Result<ApiRequest> {
        if let Some(token) = self.session.token() {
            let value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                TasklaneError::Storage("stored token is not a valid header value".into())
            })?;
            request.headers.insert(AUTHORIZATION, value);
        }

        if !request.is_multipart() {
            request
                .headers
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tasklane_core::storage::MemoryStore;

    use super::*;
    use crate::request::FilePart;

    fn session() -> SessionProvider {
        SessionProvider::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_attaches_token_when_present() {
        let session = session();
        session.login("tok-123", None).unwrap();
        let auth = BearerAuth::new(session);

        let request = auth.on_request(ApiRequest::get("/tasks/")).await.unwrap();
        assert_eq!(request.bearer_token(), Some("tok-123"));
        assert_eq!(request.headers[CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn test_no_credential_without_token() {
        let auth = BearerAuth::new(session());

        let request = auth
            .on_request(ApiRequest::post("/auth/login"))
            .await
            .unwrap();
        assert!(request.headers.get(AUTHORIZATION).is_none());
        assert_eq!(request.headers[CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn test_token_read_per_request() {
        let session = session();
        let auth = BearerAuth::new(session.clone());

        session.login("first", None).unwrap();
        let r1 = auth.on_request(ApiRequest::get("/a")).await.unwrap();
        session.login("second", None).unwrap();
        let r2 = auth.on_request(ApiRequest::get("/a")).await.unwrap();
        session.clear().unwrap();
        let r3 = auth.on_request(ApiRequest::get("/a")).await.unwrap();

        assert_eq!(r1.bearer_token(), Some("first"));
        assert_eq!(r2.bearer_token(), Some("second"));
        assert_eq!(r3.bearer_token(), None);
    }

    #[tokio::test]
    async fn test_multipart_keeps_content_type_unset() {
        let session = session();
        session.login("t", None).unwrap();
        let auth = BearerAuth::new(session);

        let request = ApiRequest::post("/bot/voice")
            .multipart(vec![FilePart::new("audio", "voice.wav", vec![1, 2])]);
        let request = auth.on_request(request).await.unwrap();
        assert_eq!(request.bearer_token(), Some("t"));
        assert!(request.headers.get(CONTENT_TYPE).is_none());
    }

    #[tokio::test]
    async fn test_invalid_token_rejected() {
        let session = session();
        session.login("bad\ntoken", None).unwrap();
        let auth = BearerAuth::new(session);

        let err = auth.on_request(ApiRequest::get("/a")).await.unwrap_err();
        assert!(matches!(err, TasklaneError::Storage(_)));
    }
}
