//! Session expiry: forced logout when the backend answers 401.
//!
//! Sequence per expiry: best-effort `DELETE /activity/clear`, then token
//! removal, then a forced redirect to the login entry, then the original
//! error is handed back to the caller. The cleanup call goes through a
//! pipeline without this middleware, so its own 401 cannot re-enter.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::{debug, warn};

use tasklane_core::error::Result;
use tasklane_core::navigation::Navigator;
use tasklane_core::routes::Route;
use tasklane_core::session::SessionProvider;

use crate::pipeline::{Middleware, Pipeline};
use crate::request::{ApiRequest, ApiResponse};

pub const ACTIVITY_CLEAR_PATH: &str = "/activity/clear";

pub struct SessionExpiry {
    cleanup: Pipeline,
    session: SessionProvider,
    navigator: Arc<dyn Navigator>,
    expiring: AtomicBool,
}

/// Releases the in-progress flag even if the expiry future is dropped.
struct ExpiringGuard<'a>(&'a AtomicBool);

impl Drop for ExpiringGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl SessionExpiry {
    /// `cleanup` must not contain a `SessionExpiry` itself.
    pub fn new(cleanup: Pipeline, session: SessionProvider, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            cleanup,
            session,
            navigator,
            expiring: AtomicBool::new(false),
        }
    }

    async fn expire(&self) {
        warn!("Token expired, logging out");

        if let Err(e) = self.cleanup.send(ApiRequest::delete(ACTIVITY_CLEAR_PATH)).await {
            warn!(error = %e, "Activity clear failed");
        }

        if let Err(e) = self.session.clear() {
            warn!(error = %e, "Failed to remove session token");
        }

        self.navigator.redirect(Route::LOGIN_ENTRY);
    }
}

#[async_trait]
impl Middleware for SessionExpiry {
    fn name(&self) -> &str {
        "session_expiry"
    }

    async fn on_response(&self, result: Result<ApiResponse>) -> Result<ApiResponse> {
        let err = match result {
            Err(e) if e.is_unauthorized() => e,
            other => return other,
        };

        // Overlapping 401s: only the first one runs the logout sequence.
        if self
            .expiring
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Expiry already in progress");
            return Err(err);
        }
        let _guard = ExpiringGuard(&self.expiring);

        self.expire().await;
        Err(err)
    }
}
