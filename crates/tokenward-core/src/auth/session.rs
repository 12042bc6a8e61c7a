//! Session lifecycle: login, profile fetch, silent refresh, logout.
//!
//! HTTP failures inside an operation are logged and end the session (tokens
//! cleared, navigation to the login route). Only missing-token preconditions
//! are returned to the caller.
//!
//! Refreshes are not coordinated: two overlapping calls both hit the server
//! and whichever response resolves last decides the stored access token.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{Credentials, UserProfile};
use crate::navigation::{Navigator, LOGIN_ROUTE};
use crate::storage::Storage;

use super::{RefreshTask, SessionError, SessionSnapshot, SessionStore};

/// Access token renewal period.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Period of the background refresh task.
    pub refresh_interval: Duration,
    /// Also drop the cached profile on logout. Off by default: the profile of
    /// the last user stays readable after logout.
    pub clear_user_on_logout: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            clear_user_on_logout: false,
        }
    }
}

/// Shared by the manager and its background task.
struct SessionCore {
    api: ApiClient,
    store: SessionStore,
    navigator: Arc<dyn Navigator>,
    options: SessionOptions,
}

impl SessionCore {
    async fn login(&self, credentials: &Credentials) -> bool {
        match self.exchange_and_fetch(credentials).await {
            Ok(()) => {
                if self.store.snapshot().is_logged_in() {
                    info!(username = %credentials.username, "Login successful");
                } else {
                    warn!(username = %credentials.username, "Token exchange succeeded but profile fetch ended the session");
                }
                true
            }
            Err(e) => {
                if ApiError::is_rejection(&e) {
                    warn!(username = %credentials.username, "Login rejected by backend");
                } else {
                    error!(username = %credentials.username, error = format!("{:#}", e), "Login failed");
                }
                self.logout();
                false
            }
        }
    }

    async fn exchange_and_fetch(&self, credentials: &Credentials) -> Result<()> {
        let tokens = self.api.obtain_token(credentials).await?;

        self.store.update(|s| {
            s.access_token = Some(tokens.access);
            s.refresh_token = Some(tokens.refresh);
        });

        self.fetch_user().await?;
        Ok(())
    }

    async fn fetch_user(&self) -> Result<(), SessionError> {
        let token = self
            .store
            .snapshot()
            .access_token()
            .map(str::to_owned)
            .ok_or(SessionError::MissingAccessToken)?;

        match self.api.fetch_profile(&token).await {
            Ok(user) => {
                info!(user_id = user.id, username = %user.username, "User profile loaded");
                self.store.update(|s| s.user = Some(user));
            }
            Err(e) => {
                error!(error = format!("{:#}", e), "Failed to fetch user profile");
                self.logout();
            }
        }
        Ok(())
    }

    async fn refresh(&self) -> Result<(), SessionError> {
        let token = self
            .store
            .snapshot()
            .refresh_token()
            .map(str::to_owned)
            .ok_or(SessionError::MissingRefreshToken)?;

        match self.api.refresh_access(&token).await {
            Ok(response) => {
                self.store.update(|s| s.access_token = Some(response.access));
                info!("Access token refreshed");
            }
            Err(e) => {
                error!(error = format!("{:#}", e), "Token refresh failed");
                self.logout();
            }
        }
        Ok(())
    }

    fn logout(&self) {
        let clear_user = self.options.clear_user_on_logout;
        let changed = self.store.update(|s| {
            s.access_token = None;
            s.refresh_token = None;
            if clear_user {
                s.user = None;
            }
        });
        if changed {
            info!("Session cleared");
        }
        self.navigator.navigate_to(LOGIN_ROUTE);
    }
}

/// Owns the token pair and cached profile, and the background refresh task.
///
/// Dropping the manager cancels its refresh task.
pub struct SessionManager {
    core: Arc<SessionCore>,
    refresher: Option<RefreshTask>,
}

impl SessionManager {
    /// Create a manager over the persisted state, without background refresh
    pub fn new(
        api: ApiClient,
        storage: Arc<dyn Storage>,
        navigator: Arc<dyn Navigator>,
        options: SessionOptions,
    ) -> Self {
        let core = SessionCore {
            api,
            store: SessionStore::load(storage),
            navigator,
            options,
        };
        Self {
            core: Arc::new(core),
            refresher: None,
        }
    }

    /// Create a manager and start background refresh right away.
    ///
    /// The first refresh runs immediately. Must be called inside a tokio runtime.
    pub fn spawn(
        api: ApiClient,
        storage: Arc<dyn Storage>,
        navigator: Arc<dyn Navigator>,
        options: SessionOptions,
    ) -> Self {
        let mut manager = Self::new(api, storage, navigator, options);
        manager.start_auto_refresh();
        manager
    }

    /// Start (or restart) the background refresh task
    pub fn start_auto_refresh(&mut self) {
        let core = Arc::clone(&self.core);
        let period = core.options.refresh_interval;
        let task = RefreshTask::spawn(period, move || {
            let core = Arc::clone(&core);
            async move { core.refresh().await }
        });
        // Replacing drops (and cancels) any previous task.
        self.refresher = Some(task);
    }

    pub fn stop_auto_refresh(&mut self) {
        if let Some(task) = self.refresher.take() {
            task.stop();
        }
    }

    pub fn is_auto_refreshing(&self) -> bool {
        self.refresher.as_ref().is_some_and(RefreshTask::is_running)
    }

    /// Period of the active background refresh, if one was started
    pub fn auto_refresh_period(&self) -> Option<Duration> {
        self.refresher.as_ref().map(RefreshTask::period)
    }

    /// Stop background refresh and wait for it to exit
    pub async fn shutdown(mut self) {
        if let Some(task) = self.refresher.take() {
            task.shutdown().await;
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Exchange credentials for tokens, then load the profile.
    ///
    /// Returns `false` (after logging out) when the exchange fails. A failed
    /// profile fetch ends the session too, but still returns `true`; check
    /// [`SessionManager::is_logged_in`] afterwards.
    pub async fn login(&self, credentials: &Credentials) -> bool {
        self.core.login(credentials).await
    }

    /// Load the profile for the current access token
    pub async fn fetch_user(&self) -> Result<(), SessionError> {
        self.core.fetch_user().await
    }

    /// Replace the access token using the refresh token
    pub async fn refresh(&self) -> Result<(), SessionError> {
        self.core.refresh().await
    }

    /// Clear both tokens and navigate to the login route. Idempotent.
    pub fn logout(&self) {
        self.core.logout()
    }

    // =========================================================================
    // State
    // =========================================================================

    pub fn access_token(&self) -> Option<String> {
        self.core.store.snapshot().access_token
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.core.store.snapshot().refresh_token
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.core.store.snapshot().user
    }

    pub fn is_logged_in(&self) -> bool {
        self.core.store.snapshot().is_logged_in()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.core.store.snapshot()
    }

    /// Receive a snapshot after every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.core.store.subscribe()
    }

    /// Pick up changes another writer made to storage
    pub fn reload(&self) -> bool {
        self.core.store.reload()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Routes(Mutex<Vec<String>>);

    impl Navigator for Routes {
        fn navigate_to(&self, route: &str) {
            self.0.lock().unwrap().push(route.to_string());
        }
    }

    // Nothing listens on port 9; any request would fail and log out.
    fn unreachable_api() -> ApiClient {
        ApiClient::new("http://127.0.0.1:9").unwrap()
    }

    fn manager(storage: Arc<MemoryStore>, options: SessionOptions) -> (SessionManager, Arc<Routes>) {
        let routes = Arc::new(Routes::default());
        let manager = SessionManager::new(unreachable_api(), storage, routes.clone(), options);
        (manager, routes)
    }

    fn profile_json() -> String {
        r#"{"id":1,"username":"alice","email":"","first_name":"","last_name":"","is_staff":false}"#
            .to_string()
    }

    #[tokio::test]
    async fn test_fetch_user_without_access_token_fails_fast() {
        let storage = Arc::new(MemoryStore::with_entries([(REFRESH_TOKEN_KEY, "R1")]));
        let (manager, routes) = manager(storage, SessionOptions::default());

        let result = manager.fetch_user().await;

        assert_eq!(result, Err(SessionError::MissingAccessToken));
        assert_eq!(manager.refresh_token().as_deref(), Some("R1"));
        assert!(routes.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_fails_fast() {
        let storage = Arc::new(MemoryStore::with_entries([(ACCESS_TOKEN_KEY, "A1")]));
        let (manager, routes) = manager(storage, SessionOptions::default());

        let result = manager.refresh().await;

        assert_eq!(result, Err(SessionError::MissingRefreshToken));
        assert_eq!(manager.access_token().as_deref(), Some("A1"));
        assert!(routes.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let storage = Arc::new(MemoryStore::new());
        let (manager, routes) = manager(storage, SessionOptions::default());
        let rx = manager.subscribe();

        manager.logout();
        manager.logout();

        assert!(manager.access_token().is_none());
        assert!(manager.refresh_token().is_none());
        assert!(!rx.has_changed().unwrap());
        assert_eq!(*routes.0.lock().unwrap(), vec![LOGIN_ROUTE, LOGIN_ROUTE]);
    }

    #[tokio::test]
    async fn test_logout_keeps_profile_by_default() {
        let storage = Arc::new(MemoryStore::with_entries([
            (ACCESS_TOKEN_KEY, "A1".to_string()),
            (REFRESH_TOKEN_KEY, "R1".to_string()),
            (USER_KEY, profile_json()),
        ]));
        let (manager, _) = manager(storage.clone(), SessionOptions::default());
        assert!(manager.is_logged_in());

        manager.logout();

        assert!(!manager.is_logged_in());
        assert_eq!(manager.user().map(|u| u.username).as_deref(), Some("alice"));
        assert!(storage.get(USER_KEY).unwrap().is_some());
        assert!(storage.get(REFRESH_TOKEN_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_logout_can_clear_profile() {
        let storage = Arc::new(MemoryStore::with_entries([
            (REFRESH_TOKEN_KEY, "R1".to_string()),
            (USER_KEY, profile_json()),
        ]));
        let options = SessionOptions {
            clear_user_on_logout: true,
            ..SessionOptions::default()
        };
        let (manager, _) = manager(storage.clone(), options);

        manager.logout();

        assert!(manager.user().is_none());
        assert!(storage.get(USER_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_network_failure_on_refresh_logs_out() {
        let storage = Arc::new(MemoryStore::with_entries([
            (ACCESS_TOKEN_KEY, "A1"),
            (REFRESH_TOKEN_KEY, "R1"),
        ]));
        let (manager, routes) = manager(storage, SessionOptions::default());

        assert_eq!(manager.refresh().await, Ok(()));

        assert!(!manager.is_logged_in());
        assert!(manager.access_token().is_none());
        assert_eq!(*routes.0.lock().unwrap(), vec![LOGIN_ROUTE]);
    }

    #[tokio::test]
    async fn test_login_failure_returns_false() {
        let (manager, routes) = manager(Arc::new(MemoryStore::new()), SessionOptions::default());

        let ok = manager.login(&Credentials::new("alice", "secret")).await;

        assert!(!ok);
        assert!(manager.access_token().is_none());
        assert!(manager.refresh_token().is_none());
        assert_eq!(*routes.0.lock().unwrap(), vec![LOGIN_ROUTE]);
    }

    #[tokio::test]
    async fn test_spawned_manager_stops_on_request() {
        let storage = Arc::new(MemoryStore::new());
        let routes = Arc::new(Routes::default());
        let mut manager = SessionManager::spawn(
            unreachable_api(),
            storage,
            routes.clone(),
            SessionOptions::default(),
        );
        assert!(manager.is_auto_refreshing());
        assert_eq!(manager.auto_refresh_period(), Some(DEFAULT_REFRESH_INTERVAL));

        // Let the immediate tick run: with no refresh token it fails fast,
        // so nothing is requested and no logout navigation happens.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(manager.is_auto_refreshing());
        assert!(routes.0.lock().unwrap().is_empty());

        manager.stop_auto_refresh();
        assert!(!manager.is_auto_refreshing());
        assert_eq!(manager.auto_refresh_period(), None);
    }
}
