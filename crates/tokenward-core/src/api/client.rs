//! API client for the token and profile endpoints.
//!
//! The client is stateless with respect to tokens: every call takes the token
//! it needs, so the session manager stays the only owner of session state.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tracing::debug;

use crate::models::{Credentials, RefreshResponse, TokenResponse, UserProfile};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Token exchange endpoint (username/password -> access/refresh).
const TOKEN_PATH: &str = "/api/auth/token/";

/// Token refresh endpoint (refresh -> access).
const TOKEN_REFRESH_PATH: &str = "/api/auth/token/refresh/";

/// Profile of the user owning the bearer token.
const PROFILE_PATH: &str = "/api/users/profile/";

/// API client for the authentication backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    timeout: Option<Duration>,
}

impl ApiClient {
    /// Create a new API client for the given base URL.
    ///
    /// Requests have no deadline: a hung call stays pending until the server
    /// answers or the connection drops.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::build(base_url, None)
    }

    /// Create a new API client that fails requests running longer than `timeout`
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Self::build(base_url, Some(timeout))
    }

    fn build(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Exchange credentials for an access/refresh pair
    pub async fn obtain_token(&self, credentials: &Credentials) -> Result<TokenResponse> {
        debug!(username = %credentials.username, "Requesting token pair");
        self.post(&self.url(TOKEN_PATH), credentials).await
    }

    /// Obtain a new access token for the given refresh token
    pub async fn refresh_access(&self, refresh_token: &str) -> Result<RefreshResponse> {
        debug!("Requesting access token refresh");
        self.post(&self.url(TOKEN_REFRESH_PATH), &json!({ "refresh": refresh_token }))
            .await
    }

    /// Fetch the profile of the user the access token belongs to
    pub async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile> {
        debug!("Requesting user profile");
        self.get(&self.url(PROFILE_PATH), access_token).await
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: &str, token: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .bearer_auth(token)
            .send()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to send GET request to {}", url))?;

        let response = Self::check_response(response).await?;

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<T> {
        let response = self
            .client
            .post(url)
            .header(header::ACCEPT, "application/json")
            .json(body)
            .send()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to send POST request to {}", url))?;

        let response = Self::check_response(response).await?;

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }
}
