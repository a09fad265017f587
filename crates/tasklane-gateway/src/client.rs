//! Typed client for the backend REST surface.
//!
//! Every call goes through the shared [`Pipeline`]; 401 handling is left to
//! [`SessionExpiry`] and every other failure is returned to the caller.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{info, warn};

use tasklane_core::config::Config;
use tasklane_core::error::{Result, TasklaneError};
use tasklane_core::navigation::Navigator;
use tasklane_core::preferences::Preferences;
use tasklane_core::routes::Route;
use tasklane_core::session::SessionProvider;
use tasklane_core::storage::KeyValueStore;
use tasklane_core::types::{
    ActivityEntry, AiSummary, Analytics, BotReply, ExportFormat, LoginResponse, MessageReply,
    NewTask, Profile, ProfileUpdate, Task, TaskStatus, TaskUpdate, User,
};

use crate::auth::BearerAuth;
use crate::expiry::{ACTIVITY_CLEAR_PATH, SessionExpiry};
use crate::pipeline::Pipeline;
use crate::request::{ApiRequest, FilePart};
use crate::transport::{HttpTransport, Transport};

fn require(fields: &[&str], message: &str) -> Result<()> {
    if fields.iter().any(|f| f.trim().is_empty()) {
        return Err(TasklaneError::validation(message));
    }
    Ok(())
}

pub struct ApiClient {
    pipeline: Pipeline,
    session: SessionProvider,
    preferences: Preferences,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let session = SessionProvider::new(store.clone());
        Self::with_session(transport, session, Preferences::new(store), navigator)
    }

    pub fn with_session(
        transport: Arc<dyn Transport>,
        session: SessionProvider,
        preferences: Preferences,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let base = Pipeline::new(transport).with(BearerAuth::new(session.clone()));
        let pipeline = base.clone().with(SessionExpiry::new(
            base,
            session.clone(),
            navigator.clone(),
        ));

        Self {
            pipeline,
            session,
            preferences,
            navigator,
        }
    }

    /// Build a client talking HTTP to the configured backend.
    pub fn from_config(
        config: &Config,
        session: SessionProvider,
        preferences: Preferences,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let transport = HttpTransport::new(config.base_url(), config.request_timeout())?;
        Ok(Self::with_session(
            Arc::new(transport),
            session,
            preferences,
            navigator,
        ))
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn session(&self) -> &SessionProvider {
        &self.session
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        self.pipeline.send(request).await?.json()
    }

    // --- Auth ---

    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        require(&[email, password], "Email and password required")?;

        let resp: LoginResponse = self
            .call(ApiRequest::post("/auth/login").json(&json!({
                "email": email,
                "password": password,
            }))?)
            .await?;

        self.session.login(&resp.token, Some(&resp.user))?;
        info!(user = %resp.user.email, "Logged in");
        Ok(resp.user)
    }

    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<MessageReply> {
        require(&[name, email, password], "All fields are required")?;

        self.call(ApiRequest::post("/auth/signup").json(&json!({
            "name": name,
            "email": email,
            "password": password,
        }))?)
        .await
    }

    /// Explicit logout. The backend call is best-effort; the local session
    /// is always cleared.
    pub async fn logout(&self) -> Result<()> {
        if let Err(e) = self.pipeline.send(ApiRequest::post("/auth/logout")).await {
            warn!(error = %e, "Logout error ignored");
        }
        self.session.clear()?;
        self.navigator.navigate(Route::Login);
        Ok(())
    }

    /// First recovery step: request an OTP and remember the email for step two.
    pub async fn forgot_password(&self, email: &str) -> Result<MessageReply> {
        require(&[email], "Email is required")?;

        let reply: MessageReply = self
            .call(ApiRequest::post("/auth/forgot-password").json(&json!({ "email": email }))?)
            .await?;
        self.preferences.set_reset_email(email)?;
        Ok(reply)
    }

    /// Second recovery step, using the email stored by [`forgot_password`](Self::forgot_password).
    pub async fn reset_password(
        &self,
        otp: &str,
        new_password: &str,
        confirm: &str,
    ) -> Result<MessageReply> {
        let Some(email) = self.preferences.reset_email() else {
            return Err(TasklaneError::validation(
                "Invalid reset request. Please try again.",
            ));
        };
        require(&[otp], "Please enter OTP")?;
        if new_password != confirm {
            return Err(TasklaneError::validation("Passwords do not match!"));
        }

        let reply: MessageReply = self
            .call(ApiRequest::post("/auth/reset-password").json(&json!({
                "email": email,
                "otp": otp,
                "new_password": new_password,
            }))?)
            .await?;
        self.preferences.clear_reset_email()?;
        Ok(reply)
    }

    pub async fn change_password(
        &self,
        current: &str,
        new_password: &str,
        confirm: &str,
    ) -> Result<MessageReply> {
        require(&[current, new_password, confirm], "All fields are required.")?;
        if new_password != confirm {
            return Err(TasklaneError::validation("New passwords do not match."));
        }

        self.call(ApiRequest::put("/auth/change-password").json(&json!({
            "current_password": current,
            "new_password": new_password,
        }))?)
        .await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<MessageReply> {
        self.call(ApiRequest::put("/auth/update").json(update)?)
            .await
    }

    pub async fn me(&self) -> Result<Profile> {
        self.call(ApiRequest::get("/auth/me")).await
    }

    /// Profile for the navigation header; failures fall back to an empty profile.
    pub async fn sidebar_profile(&self) -> Profile {
        match self.me().await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(error = %e, "Sidebar user load error");
                Profile::default()
            }
        }
    }

    // --- Tasks ---

    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        self.call(ApiRequest::get("/tasks/")).await
    }

    pub async fn get_task(&self, id: &str) -> Result<Task> {
        self.call(ApiRequest::get(format!("/tasks/{id}"))).await
    }

    pub async fn create_task(&self, task: &NewTask) -> Result<MessageReply> {
        require(&[&task.title, &task.date], "Title, priority and date are required")?;
        self.call(ApiRequest::post("/tasks/").json(task)?).await
    }

    pub async fn update_task(&self, id: &str, update: &TaskUpdate) -> Result<MessageReply> {
        self.call(ApiRequest::put(format!("/tasks/{id}")).json(update)?)
            .await
    }

    pub async fn delete_task(&self, id: &str) -> Result<MessageReply> {
        self.call(ApiRequest::delete(format!("/tasks/{id}"))).await
    }

    /// The single call a Kanban drop produces.
    pub async fn update_status(&self, id: &str, status: TaskStatus) -> Result<MessageReply> {
        self.call(
            ApiRequest::put(format!("/tasks/status/{id}")).json(&json!({ "status": status }))?,
        )
        .await
    }

    pub async fn analytics(&self) -> Result<Analytics> {
        self.call(ApiRequest::get("/tasks/analytics")).await
    }

    pub async fn overdue(&self) -> Result<Vec<Task>> {
        self.call(ApiRequest::get("/tasks/overdue")).await
    }

    pub async fn upcoming(&self) -> Result<Vec<Task>> {
        self.call(ApiRequest::get("/tasks/upcoming")).await
    }

    /// Download all tasks. The export endpoints read the token from the
    /// query string rather than the header.
    pub async fn export(&self, format: ExportFormat) -> Result<Vec<u8>> {
        let mut request = ApiRequest::get(format!("/tasks/export/{}", format.as_str()));
        if let Some(token) = self.session.token() {
            request = request.query("token", token);
        }
        Ok(self.pipeline.send(request).await?.body)
    }

    // --- Activity, AI, bot ---

    pub async fn activity(&self) -> Result<Vec<ActivityEntry>> {
        self.call(ApiRequest::get("/activity/")).await
    }

    pub async fn clear_activity(&self) -> Result<()> {
        self.pipeline
            .send(ApiRequest::delete(ACTIVITY_CLEAR_PATH))
            .await?;
        Ok(())
    }

    pub async fn ai_summary(&self) -> Result<String> {
        let summary: AiSummary = self.call(ApiRequest::get("/ai/summary")).await?;
        Ok(summary.summary)
    }

    /// Upload a recorded clip to the voice assistant.
    pub async fn voice_bot(&self, audio: Vec<u8>, file_name: &str) -> Result<BotReply> {
        if audio.is_empty() {
            return Err(TasklaneError::validation("No audio recorded"));
        }
        self.call(
            ApiRequest::post("/bot/voice").multipart(vec![FilePart::new("audio", file_name, audio)]),
        )
        .await
    }

    /// Text-only variant of the assistant.
    pub async fn voice_command(&self, text: &str) -> Result<BotReply> {
        require(&[text], "Say something first")?;
        self.call(ApiRequest::post("/voice/command").json(&json!({ "text": text }))?)
            .await
    }
}
