//! The application's page set.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Landing,
    Login,
    Register,
    ForgotPassword,
    ResetPassword,
    Dashboard,
    Tasks,
    Kanban,
    Analytics,
    Settings,
    Profile,
    Activity,
    AddTask,
    EditTask(String),
    TaskDetail(String),
    Voice,
    AiSummary,
}

impl Route {
    /// Where the session guard and forced logout send the user.
    pub const LOGIN_ENTRY: Route = Route::Login;

    pub fn path(&self) -> String {
        match self {
            Self::Landing => "/".into(),
            Self::Login => "/login".into(),
            Self::Register => "/register".into(),
            Self::ForgotPassword => "/forgot-password".into(),
            Self::ResetPassword => "/reset-password".into(),
            Self::Dashboard => "/dashboard".into(),
            Self::Tasks => "/tasks".into(),
            Self::Kanban => "/kanban".into(),
            Self::Analytics => "/analytics".into(),
            Self::Settings => "/settings".into(),
            Self::Profile => "/profile".into(),
            Self::Activity => "/activity".into(),
            Self::AddTask => "/add-task".into(),
            Self::EditTask(id) => format!("/edit-task/{id}"),
            Self::TaskDetail(id) => format!("/task/{id}"),
            Self::Voice => "/voice".into(),
            Self::AiSummary => "/ai-summary".into(),
        }
    }

    /// Parse a path (query string ignored) back into a route.
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split('?').next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');

        if let Some(id) = trimmed.strip_prefix("/edit-task/") {
            return (!id.is_empty() && !id.contains('/')).then(|| Self::EditTask(id.to_string()));
        }
        if let Some(id) = trimmed.strip_prefix("/task/") {
            return (!id.is_empty() && !id.contains('/')).then(|| Self::TaskDetail(id.to_string()));
        }

        let route = match trimmed {
            "" => Self::Landing,
            "/login" => Self::Login,
            "/register" => Self::Register,
            "/forgot-password" => Self::ForgotPassword,
            "/reset-password" => Self::ResetPassword,
            "/dashboard" => Self::Dashboard,
            "/tasks" => Self::Tasks,
            "/kanban" => Self::Kanban,
            "/analytics" => Self::Analytics,
            "/settings" => Self::Settings,
            "/profile" => Self::Profile,
            "/activity" => Self::Activity,
            "/add-task" => Self::AddTask,
            "/voice" => Self::Voice,
            "/ai-summary" => Self::AiSummary,
            _ => return None,
        };
        Some(route)
    }

    /// Whether rendering this page requires a session token.
    pub fn is_protected(&self) -> bool {
        !matches!(
            self,
            Self::Landing
                | Self::Login
                | Self::Register
                | Self::ForgotPassword
                | Self::ResetPassword
                | Self::Voice
        )
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
