//! UI preferences persisted beside the session: theme, sidebar collapse,
//! and the email carried between the two password-recovery steps.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::storage::{KeyValueStore, keys};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Anything other than `"dark"` reads as light.
    pub fn theme(&self) -> Theme {
        match self.store.get(keys::THEME).as_deref() {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        }
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        self.store.set(keys::THEME, theme.as_str())
    }

    pub fn toggle_theme(&self) -> Result<Theme> {
        let next = self.theme().toggled();
        self.set_theme(next)?;
        Ok(next)
    }

    pub fn sidebar_collapsed(&self) -> bool {
        self.store.get(keys::SIDEBAR_COLLAPSED).as_deref() == Some("true")
    }

    pub fn set_sidebar_collapsed(&self, collapsed: bool) -> Result<()> {
        self.store
            .set(keys::SIDEBAR_COLLAPSED, if collapsed { "true" } else { "false" })
    }

    pub fn reset_email(&self) -> Option<String> {
        self.store.get(keys::RESET_EMAIL).filter(|e| !e.is_empty())
    }

    pub fn set_reset_email(&self, email: &str) -> Result<()> {
        self.store.set(keys::RESET_EMAIL, email)
    }

    pub fn clear_reset_email(&self) -> Result<()> {
        self.store.remove(keys::RESET_EMAIL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionProvider;
    use crate::storage::{JsonFileStore, MemoryStore};

    #[test]
    fn test_theme_persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let prefs = Preferences::new(Arc::new(JsonFileStore::open(&path).unwrap()));
        prefs.set_theme(Theme::Dark).unwrap();

        let reloaded = Preferences::new(Arc::new(JsonFileStore::open(&path).unwrap()));
        assert_eq!(reloaded.theme(), Theme::Dark);
    }

    #[test]
    fn test_theme_independent_of_token() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let prefs = Preferences::new(store.clone());
        let session = SessionProvider::new(store);

        prefs.set_theme(Theme::Dark).unwrap();
        session.login("t", None).unwrap();
        assert_eq!(prefs.theme(), Theme::Dark);
        session.clear().unwrap();
        assert_eq!(prefs.theme(), Theme::Dark);

        assert_eq!(prefs.toggle_theme().unwrap(), Theme::Light);
        assert_eq!(prefs.theme(), Theme::Light);
    }

    #[test]
    fn test_sidebar_and_reset_email() {
        let prefs = Preferences::new(Arc::new(MemoryStore::new()));
        assert!(!prefs.sidebar_collapsed());
        prefs.set_sidebar_collapsed(true).unwrap();
        assert!(prefs.sidebar_collapsed());

        assert!(prefs.reset_email().is_none());
        prefs.set_reset_email("a@b.c").unwrap();
        assert_eq!(prefs.reset_email().as_deref(), Some("a@b.c"));
        prefs.clear_reset_email().unwrap();
        assert!(prefs.reset_email().is_none());
    }
}
