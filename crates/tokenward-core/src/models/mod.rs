//! Data models for session entities.
//!
//! - `Credentials`: transient login input, never persisted
//! - `TokenPair`: access/refresh JWT pair
//! - `UserProfile`: the signed-in user's profile as served by the backend

pub mod token;
pub mod user;

pub use token::{Credentials, RefreshResponse, TokenPair, TokenResponse};
pub use user::UserProfile;
