//! REST API client module for the authentication backend.
//!
//! This module provides the `ApiClient` for the three endpoints the session
//! manager needs: token exchange, token refresh, and the user profile.
//!
//! The backend issues JWT access/refresh pairs; the profile endpoint expects
//! the access token as a bearer credential.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
