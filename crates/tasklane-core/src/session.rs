//! Session provider: the client's belief about authentication state.
//!
//! The bearer token in storage is the only signal of being logged in; no
//! expiry is tracked client-side. Components read it through a
//! [`SessionProvider`] and may [`subscribe`](SessionProvider::subscribe) to
//! changes instead of polling storage.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::Result;
use crate::storage::{KeyValueStore, keys};
use crate::types::User;

/// Snapshot published to subscribers on every session change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub authenticated: bool,
}

#[derive(Clone)]
pub struct SessionProvider {
    store: Arc<dyn KeyValueStore>,
    tx: Arc<watch::Sender<SessionState>>,
}

impl SessionProvider {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let initial = SessionState {
            authenticated: store.get(keys::TOKEN).is_some_and(|t| !t.is_empty()),
        };
        let (tx, _rx) = watch::channel(initial);
        Self {
            store,
            tx: Arc::new(tx),
        }
    }

    /// Current bearer token, read from storage on every call.
    pub fn token(&self) -> Option<String> {
        self.store.get(keys::TOKEN).filter(|t| !t.is_empty())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Cached user from the last login, if it can be decoded.
    pub fn user(&self) -> Option<User> {
        let raw = self.store.get(keys::USER)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "Ignoring undecodable cached user");
                None
            }
        }
    }

    /// Store the token (and cached user) after a successful login.
    pub fn login(&self, token: &str, user: Option<&User>) -> Result<()> {
        self.store.set(keys::TOKEN, token)?;
        if let Some(user) = user {
            self.store.set(keys::USER, &serde_json::to_string(user)?)?;
        }
        debug!("Session token stored");
        self.publish();
        Ok(())
    }

    /// Remove the token. Returns whether one was present.
    ///
    /// The cached user is left in place, matching a reload after expiry.
    pub fn clear(&self) -> Result<bool> {
        let had_token = self.store.get(keys::TOKEN).is_some();
        self.store.remove(keys::TOKEN)?;
        debug!(had_token, "Session token removed");
        self.publish();
        Ok(had_token)
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            authenticated: self.is_authenticated(),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    fn publish(&self) {
        self.tx.send_replace(self.state());
    }
}
