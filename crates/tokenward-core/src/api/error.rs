use thiserror::Error;

/// Failure talking to the token or profile endpoints.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Credentials or token rejected (401)")]
    Unauthorized,

    #[error("Account not permitted (403): {0}")]
    AccessDenied(String),

    #[error("Endpoint not found (404): {0}")]
    NotFound(String),

    #[error("Backend is throttling requests (429)")]
    RateLimited,

    #[error("Backend failure: {0}")]
    ServerError(String),

    #[error("Could not reach backend: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError(truncated),
            _ => ApiError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }

    /// True when the server rejected the presented credential or token.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::Unauthorized | ApiError::AccessDenied(_))
    }

    /// Whether an error chain bottoms out in a server-side rejection
    pub fn is_rejection(err: &anyhow::Error) -> bool {
        err.downcast_ref::<ApiError>()
            .is_some_and(ApiError::is_auth_failure)
    }
}
