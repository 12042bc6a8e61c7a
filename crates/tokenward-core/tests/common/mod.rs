// Shared by several test binaries; each uses a subset.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokenward_core::{ApiClient, MemoryStore, Navigator, SessionManager, SessionOptions};
use wiremock::MockServer;

/// Records every route the manager navigates to.
#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<String> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate_to(&self, route: &str) {
        self.routes.lock().unwrap().push(route.to_string());
    }
}

pub struct Harness {
    pub manager: SessionManager,
    pub storage: Arc<MemoryStore>,
    pub navigator: Arc<RecordingNavigator>,
}

pub fn harness(server: &MockServer, storage: MemoryStore) -> Harness {
    harness_with_api(ApiClient::new(server.uri()).unwrap(), storage)
}

pub fn harness_with_api(api: ApiClient, storage: MemoryStore) -> Harness {
    let storage = Arc::new(storage);
    let navigator = Arc::new(RecordingNavigator::default());
    let manager = SessionManager::new(
        api,
        storage.clone(),
        navigator.clone(),
        SessionOptions::default(),
    );
    Harness {
        manager,
        storage,
        navigator,
    }
}

pub fn alice_profile() -> Value {
    json!({
        "id": 1,
        "username": "alice",
        "email": "alice@example.com",
        "first_name": "Alice",
        "last_name": "Liddell",
        "is_staff": false
    })
}
