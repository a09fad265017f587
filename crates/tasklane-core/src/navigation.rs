//! Navigation surface: the injected capability that moves the active view.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::routes::Route;
use crate::session::SessionProvider;

pub trait Navigator: Send + Sync {
    /// In-app navigation. Subject to the protected-route guard.
    fn navigate(&self, route: Route);

    /// Forced navigation that bypasses in-app routing and its guard.
    fn redirect(&self, route: Route);

    fn current(&self) -> Route;
}

/// How a route change came about, as recorded by [`History`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Visit {
    Navigated(Route),
    /// The guard replaced the requested route with the login entry.
    Guarded { requested: Route },
    Redirected(Route),
}

impl Visit {
    pub fn route(&self) -> Route {
        match self {
            Self::Navigated(route) | Self::Redirected(route) => route.clone(),
            Self::Guarded { .. } => Route::LOGIN_ENTRY,
        }
    }
}

/// Navigator that keeps the visit log and applies the session guard.
pub struct History {
    session: SessionProvider,
    visits: Mutex<Vec<Visit>>,
    start: Route,
}

impl History {
    pub fn new(session: SessionProvider, start: Route) -> Self {
        Self {
            session,
            visits: Mutex::new(Vec::new()),
            start,
        }
    }

    pub fn visits(&self) -> Vec<Visit> {
        self.lock().clone()
    }

    /// Number of forced redirects issued so far.
    pub fn redirect_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|v| matches!(v, Visit::Redirected(_)))
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Visit>> {
        self.visits.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Navigator for History {
    fn navigate(&self, route: Route) {
        let visit = if route.is_protected() && !self.session.is_authenticated() {
            info!(requested = %route, "No session, sending to login");
            Visit::Guarded { requested: route }
        } else {
            debug!(%route, "Navigate");
            Visit::Navigated(route)
        };
        self.lock().push(visit);
    }

    fn redirect(&self, route: Route) {
        info!(%route, "Forced redirect");
        self.lock().push(Visit::Redirected(route));
    }

    fn current(&self) -> Route {
        self.lock()
            .last()
            .map(Visit::route)
            .unwrap_or_else(|| self.start.clone())
    }
}
