//! ============================================================================
//! Session Store - Simulated sign-in state
//! ============================================================================
//! Holds who is signed in. There is no credential check here: callers
//! validate the login form first. Persisted under its own key so clearing
//! the cart never signs the user out and vice versa.
//! ============================================================================

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::storage::{load_record, remove_record, save_record, Storage};
use crate::types::User;

/// Storage key for the session record
pub const SESSION_STORAGE_KEY: &str = "auth-storage";

/// Persisted shape of the session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub is_authenticated: bool,
    pub user: Option<User>,
}

impl SessionRecord {
    /// Collapse to the signed-in user, rejecting records where the flag and
    /// the user disagree
    fn into_user(self) -> Result<Option<User>, SessionRecord> {
        match (self.is_authenticated, self.user) {
            (true, Some(user)) => Ok(Some(user)),
            (false, None) => Ok(None),
            (is_authenticated, user) => Err(SessionRecord {
                is_authenticated,
                user,
            }),
        }
    }
}

/// Session state with write-through persistence
pub struct SessionStore {
    user: Option<User>,
    storage: Arc<dyn Storage>,
}

impl SessionStore {
    /// Restore the session from storage, or start signed out
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let user = match load_record::<SessionRecord>(storage.as_ref(), SESSION_STORAGE_KEY) {
            Some(record) => match record.into_user() {
                Ok(user) => user,
                Err(record) => {
                    warn!(
                        "Inconsistent session record (authenticated={}, user present={}) - signing out",
                        record.is_authenticated,
                        record.user.is_some()
                    );
                    None
                }
            },
            None => None,
        };

        if let Some(user) = &user {
            info!("Session restored for {}", user.username);
        }
        Self { user, storage }
    }

    /// Mark `username` as signed in
    pub fn login(&mut self, username: &str) {
        self.user = Some(User {
            username: username.to_string(),
        });
        info!("Signed in as {}", username);
        self.persist();
    }

    /// Back to the signed-out state. The persisted record is deleted, which
    /// restores as signed out.
    pub fn logout(&mut self) {
        if let Some(user) = self.user.take() {
            info!("Signed out {}", user.username);
        }
        remove_record(self.storage.as_ref(), SESSION_STORAGE_KEY);
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Snapshot in the persisted shape
    pub fn record(&self) -> SessionRecord {
        SessionRecord {
            is_authenticated: self.user.is_some(),
            user: self.user.clone(),
        }
    }

    fn persist(&self) {
        save_record(self.storage.as_ref(), SESSION_STORAGE_KEY, &self.record());
    }
}
