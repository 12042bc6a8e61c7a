use thiserror::Error;

/// Errors surfaced to callers of session operations.
///
/// HTTP failures never show up here: they end the session instead.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("no access token available")]
    MissingAccessToken,

    #[error("no refresh token available")]
    MissingRefreshToken,
}
