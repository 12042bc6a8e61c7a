use std::fmt;

use serde::{Deserialize, Serialize};

/// Login input. Serialized as the token-exchange request body.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Access/refresh token pair. Each half may be absent on its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl TokenPair {
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Response of `POST /api/auth/token/`.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access: String,
    pub refresh: String,
}

/// Response of `POST /api/auth/token/refresh/`.
///
/// A rotating backend may also send `refresh`; it is not read.
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("alice", "secret");
        let out = format!("{:?}", creds);
        assert!(out.contains("alice"));
        assert!(!out.contains("secret"));
    }

    #[test]
    fn test_credentials_serialize_as_exchange_body() {
        let creds = Credentials::new("alice", "secret");
        let json = serde_json::to_value(&creds).expect("serialize credentials");
        assert_eq!(json, serde_json::json!({"username": "alice", "password": "secret"}));
    }

    #[test]
    fn test_refresh_response_ignores_rotated_refresh() {
        let json = r#"{"access": "A2", "refresh": "R2"}"#;
        let resp: RefreshResponse = serde_json::from_str(json).expect("parse refresh response");
        assert_eq!(resp.access, "A2");
    }
}
