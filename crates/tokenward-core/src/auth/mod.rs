//! Authentication module for managing the token session.
//!
//! This module provides:
//! - `SessionManager`: login, logout, profile fetch and silent refresh
//! - `SessionStore`: the storage-backed session snapshot with change notification
//! - `RefreshTask`: the cancellable periodic refresh driver
//!
//! Tokens and the cached profile are persisted through a `Storage` backend and
//! the access token is renewed every five minutes by default.

pub mod error;
pub mod refresher;
pub mod session;
pub mod state;

pub use error::SessionError;
pub use refresher::RefreshTask;
pub use session::{SessionManager, SessionOptions, DEFAULT_REFRESH_INTERVAL};
pub use state::{SessionSnapshot, SessionStore};
