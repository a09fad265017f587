//! Wiring shared by every command: storage, session, navigator, client.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;

use tasklane_core::config::Config;
use tasklane_core::error::TasklaneError;
use tasklane_core::navigation::{History, Navigator};
use tasklane_core::preferences::Preferences;
use tasklane_core::routes::Route;
use tasklane_core::session::SessionProvider;
use tasklane_core::storage::{JsonFileStore, KeyValueStore};
use tasklane_gateway::ApiClient;

/// Navigator that reports route changes on the terminal.
pub struct Terminal {
    history: History,
    quiet: bool,
}

impl Terminal {
    pub fn new(session: SessionProvider, quiet: bool) -> Self {
        Self {
            history: History::new(session, Route::Landing),
            quiet,
        }
    }
}

impl Navigator for Terminal {
    fn navigate(&self, route: Route) {
        self.history.navigate(route.clone());
        let current = self.history.current();
        if self.quiet {
            return;
        }
        if current == route {
            println!("→ {}", route.path());
        } else {
            println!("→ {} (log in to open {})", current.path(), route.path());
        }
    }

    fn redirect(&self, route: Route) {
        self.history.redirect(route.clone());
        eprintln!("Session expired. Please log in again ({}).", route.path());
    }

    fn current(&self) -> Route {
        self.history.current()
    }
}

pub struct App {
    pub config: Config,
    pub config_path: PathBuf,
    pub session: SessionProvider,
    pub preferences: Preferences,
    pub navigator: Arc<Terminal>,
    pub client: ApiClient,
}

impl App {
    pub fn new(config: Config, config_path: PathBuf) -> anyhow::Result<Self> {
        let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open(config.storage_path())?);
        let session = SessionProvider::new(store.clone());
        let preferences = Preferences::new(store);
        let navigator = Arc::new(Terminal::new(session.clone(), true));
        let client = ApiClient::from_config(
            &config,
            session.clone(),
            preferences.clone(),
            navigator.clone(),
        )?;

        Ok(Self {
            config,
            config_path,
            session,
            preferences,
            navigator,
            client,
        })
    }

    /// Open a page through the session guard; fails when it bounces to login.
    pub fn enter(&self, route: Route) -> anyhow::Result<()> {
        self.navigator.navigate(route.clone());
        if self.navigator.current() != route {
            bail!("Not logged in. Run `tasklane login` first.");
        }
        Ok(())
    }

    /// Print a failed command's error for the user.
    pub fn report(&self, err: &anyhow::Error) {
        match err.downcast_ref::<TasklaneError>() {
            Some(e @ TasklaneError::Api { status, .. }) => {
                eprintln!("Error: {}", e.user_message(&format!("Request failed ({status})")));
            }
            Some(e @ TasklaneError::Transport(_)) => {
                eprintln!(
                    "Error: cannot reach {} ({e})",
                    self.config.base_url()
                );
            }
            Some(e) => eprintln!("Error: {}", e.user_message(&e.to_string())),
            None => eprintln!("Error: {err:#}"),
        }
    }
}
