//! Persistent key-value storage for session state.
//!
//! This module provides:
//! - `Storage`: the string key/value contract the session state is written through
//! - `FileStore`: a JSON file on disk, the durable backend used by the CLI
//! - `MemoryStore`: a process-local map, for embedding and tests
//!
//! Absent values are removed rather than stored as `null`.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use anyhow::Result;

/// Key holding the raw access token string.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Key holding the raw refresh token string.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Key holding the serialized `UserProfile`.
pub const USER_KEY: &str = "user";

/// String key/value storage. Implementations must be safe to share between tasks.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    /// Write `Some` values, remove on `None`.
    fn put(&self, key: &str, value: Option<&str>) -> Result<()> {
        match value {
            Some(v) => self.set(key, v),
            None => self.remove(key),
        }
    }
}
