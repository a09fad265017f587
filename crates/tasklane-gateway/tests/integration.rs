//! Gateway integration tests: real HTTP against a mock backend.
//!
//! Run with: `cargo test -p tasklane-gateway --test integration`

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{
    body_json, body_string_contains, header, header_regex, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tasklane_core::navigation::{History, Navigator};
use tasklane_core::preferences::Preferences;
use tasklane_core::routes::Route;
use tasklane_core::session::SessionProvider;
use tasklane_core::storage::{JsonFileStore, KeyValueStore, MemoryStore, keys};
use tasklane_core::types::{ExportFormat, TaskStatus};
use tasklane_gateway::{ApiClient, HttpTransport};

struct Harness {
    server: MockServer,
    history: Arc<History>,
    client: ApiClient,
    _dir: tempfile::TempDir,
}

async fn harness(token: Option<&str>) -> Harness {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn KeyValueStore> =
        Arc::new(JsonFileStore::open(dir.path().join("storage.json")).unwrap());
    if let Some(token) = token {
        store.set(keys::TOKEN, token).unwrap();
    }

    let session = SessionProvider::new(store.clone());
    let history = Arc::new(History::new(session.clone(), Route::Dashboard));
    let transport = HttpTransport::new(server.uri(), None).unwrap();
    let client = ApiClient::with_session(
        Arc::new(transport),
        session,
        Preferences::new(store),
        history.clone(),
    );

    Harness {
        server,
        history,
        client,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_bearer_token_reaches_backend() {
    let h = harness(Some("jwt-abc")).await;
    Mock::given(method("GET"))
        .and(path("/tasks/"))
        .and(header("authorization", "Bearer jwt-abc"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"_id": "1", "title": "Write report", "priority": "High", "date": "2026-10-20", "status": "todo"},
            {"_id": "2", "title": "Review PR", "priority": "Low", "date": "2026-10-21", "status": "blocked"}
        ])))
        .expect(1)
        .mount(&h.server)
        .await;

    let tasks = h.client.list_tasks().await.unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[1].status(), Some(TaskStatus::Blocked));
}

#[tokio::test]
async fn test_login_then_status_update() {
    let h = harness(None).await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"email": "asha@example.com", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Login successful",
            "token": "fresh",
            "user": {"id": "u1", "name": "Asha", "email": "asha@example.com"}
        })))
        .mount(&h.server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/tasks/status/65f0"))
        .and(header("authorization", "Bearer fresh"))
        .and(body_json(json!({"status": "completed"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "Status updated"})),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    h.client.login("asha@example.com", "pw").await.unwrap();
    let reply = h
        .client
        .update_status("65f0", TaskStatus::Completed)
        .await
        .unwrap();
    assert_eq!(reply.message, "Status updated");
}

#[tokio::test]
async fn test_401_forces_logout() {
    let h = harness(Some("stale")).await;
    Mock::given(method("GET"))
        .and(path("/tasks/analytics"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid Token"})))
        .mount(&h.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/activity/clear"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h.client.analytics().await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.user_message("x"), "Invalid Token");
    assert!(h.client.session().token().is_none());
    assert_eq!(h.history.current(), Route::Login);
    assert_eq!(h.history.redirect_count(), 1);

    // Guard now keeps protected pages closed
    h.history.navigate(Route::Tasks);
    assert_eq!(h.history.current(), Route::Login);
}

#[tokio::test]
async fn test_server_error_keeps_session() {
    let h = harness(Some("ok")).await;
    Mock::given(method("GET"))
        .and(path("/ai/summary"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&h.server)
        .await;

    let err = h.client.ai_summary().await.unwrap_err();
    assert_eq!(err.status(), Some(500));
    assert_eq!(h.client.session().token().as_deref(), Some("ok"));
    assert_eq!(h.history.redirect_count(), 0);
}

#[tokio::test]
async fn test_voice_upload_is_multipart() {
    let h = harness(Some("t")).await;
    Mock::given(method("POST"))
        .and(path("/bot/voice"))
        .and(header("authorization", "Bearer t"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains("name=\"audio\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "reply": "Opening dashboard…",
            "action": "open_dashboard"
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let reply = h
        .client
        .voice_bot(b"RIFF0000WAVE".to_vec(), "voice.wav")
        .await
        .unwrap();
    assert_eq!(reply.reply, "Opening dashboard…");
    assert_eq!(reply.route(), Some(Route::Dashboard));
}

#[tokio::test]
async fn test_export_uses_query_token() {
    let h = harness(Some("q-token")).await;
    Mock::given(method("GET"))
        .and(path("/tasks/export/pdf"))
        .and(query_param("token", "q-token"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.4".to_vec()))
        .expect(1)
        .mount(&h.server)
        .await;

    let bytes = h.client.export(ExportFormat::Pdf).await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    // Bind then release a port so nothing is listening on it
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    store.set(keys::TOKEN, "t").unwrap();
    let session = SessionProvider::new(store.clone());
    let history = Arc::new(History::new(session.clone(), Route::Dashboard));
    let client = ApiClient::with_session(
        Arc::new(HttpTransport::new(format!("http://127.0.0.1:{port}"), None).unwrap()),
        session.clone(),
        Preferences::new(store),
        history.clone(),
    );

    let err = client.me().await.unwrap_err();
    assert!(err.status().is_none());
    assert!(session.is_authenticated());
    assert_eq!(history.redirect_count(), 0);
}
