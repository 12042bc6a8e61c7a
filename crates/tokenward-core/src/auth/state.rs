use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::warn;

use crate::models::{TokenPair, UserProfile};
use crate::storage::{Storage, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY};

/// In-memory mirror of the persisted session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
    /// When the snapshot last changed in this process; `None` right after load.
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    /// Access token, treating an empty string as absent
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Refresh token, treating an empty string as absent
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn is_logged_in(&self) -> bool {
        self.refresh_token().is_some()
    }

    pub fn tokens(&self) -> TokenPair {
        TokenPair {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }

    fn same_values(&self, other: &Self) -> bool {
        self.access_token == other.access_token
            && self.refresh_token == other.refresh_token
            && self.user == other.user
    }
}

/// Storage-backed session state.
///
/// All mutations go through [`SessionStore::update`], which writes the changed
/// keys to storage and then notifies subscribers. Storage failures are logged
/// and do not block the in-memory update.
pub struct SessionStore {
    storage: Arc<dyn Storage>,
    tx: watch::Sender<SessionSnapshot>,
}

impl SessionStore {
    /// Build the store from whatever is currently persisted
    pub fn load(storage: Arc<dyn Storage>) -> Self {
        let snapshot = read_snapshot(storage.as_ref());
        let (tx, _) = watch::channel(snapshot);
        Self { storage, tx }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }

    /// Apply `f` to the snapshot, persist what changed, notify if anything did.
    ///
    /// Returns whether the session values changed.
    pub fn update(&self, f: impl FnOnce(&mut SessionSnapshot)) -> bool {
        let storage = self.storage.as_ref();
        self.tx.send_if_modified(|current| {
            let mut next = current.clone();
            f(&mut next);
            if next.same_values(current) {
                return false;
            }

            persist_changes(storage, current, &next);
            next.updated_at = Some(Utc::now());
            *current = next;
            true
        })
    }

    /// Re-read storage, picking up writes made outside this store.
    pub fn reload(&self) -> bool {
        let fresh = read_snapshot(self.storage.as_ref());
        self.tx.send_if_modified(|current| {
            if fresh.same_values(current) {
                return false;
            }
            current.access_token = fresh.access_token;
            current.refresh_token = fresh.refresh_token;
            current.user = fresh.user;
            current.updated_at = Some(Utc::now());
            true
        })
    }
}

fn read_snapshot(storage: &dyn Storage) -> SessionSnapshot {
    let user = read_key(storage, USER_KEY).and_then(|raw| {
        serde_json::from_str::<Option<UserProfile>>(&raw)
            .map_err(|e| warn!(error = %e, "Discarding unreadable stored user profile"))
            .ok()
            .flatten()
    });

    SessionSnapshot {
        access_token: read_key(storage, ACCESS_TOKEN_KEY),
        refresh_token: read_key(storage, REFRESH_TOKEN_KEY),
        user,
        updated_at: None,
    }
}

fn read_key(storage: &dyn Storage, key: &str) -> Option<String> {
    match storage.get(key) {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "Failed to read session value");
            None
        }
    }
}

fn persist_changes(storage: &dyn Storage, before: &SessionSnapshot, after: &SessionSnapshot) {
    if before.access_token != after.access_token {
        write_key(storage, ACCESS_TOKEN_KEY, after.access_token.as_deref());
    }
    if before.refresh_token != after.refresh_token {
        write_key(storage, REFRESH_TOKEN_KEY, after.refresh_token.as_deref());
    }
    if before.user != after.user {
        let serialized = match after.user.as_ref().map(serde_json::to_string).transpose() {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "Failed to serialize user profile");
                return;
            }
        };
        write_key(storage, USER_KEY, serialized.as_deref());
    }
}

fn write_key(storage: &dyn Storage, key: &str, value: Option<&str>) {
    if let Err(e) = storage.put(key, value) {
        warn!(key, error = %e, "Failed to persist session value");
    }
}
