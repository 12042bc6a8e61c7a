//! Session token lifecycle for clients of a JWT-issuing REST backend.
//!
//! The `SessionManager` logs in with username/password, keeps the access and
//! refresh tokens plus the user's profile in a persistent `Storage`, renews the
//! access token on a schedule, and sends the application back to the login
//! route whenever the backend rejects the session.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod navigation;
pub mod storage;

pub use api::{ApiClient, ApiError};
pub use auth::{SessionError, SessionManager, SessionOptions, SessionSnapshot};
pub use config::Config;
pub use models::{Credentials, TokenPair, UserProfile};
pub use navigation::{Navigator, LOGIN_ROUTE};
pub use storage::{FileStore, MemoryStore, Storage};
