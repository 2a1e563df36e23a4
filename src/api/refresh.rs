//! Access-token refresh against the backend.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

/// Tokens returned by a successful refresh.
#[derive(Debug, Clone)]
pub struct RefreshedTokens {
    pub access_token: SecretString,
    /// Present when the backend rotates the refresh token.
    pub refresh_token: Option<SecretString>,
    pub expires_in: Option<u64>,
    pub refresh_expires_in: Option<u64>,
}

/// Why a refresh did not yield a new access token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefreshFailure {
    #[error("no refresh token stored")]
    MissingRefreshToken,

    #[error("refresh rejected with status {0}")]
    Rejected(StatusCode),

    #[error("refresh request failed: {0}")]
    Network(String),

    #[error("refresh response unusable: {0}")]
    Malformed(String),
}

/// Exchanges a refresh token for a new access token.
#[async_trait]
pub trait RefreshEndpoint: Send + Sync {
    async fn refresh(&self, refresh_token: &SecretString) -> Result<RefreshedTokens, RefreshFailure>;
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    refresh_expires_in: Option<u64>,
}

/// `POST {base}/auth/refresh` with `{"refresh_token": ...}`.
pub struct HttpRefreshEndpoint {
    client: reqwest::Client,
    url: String,
}

impl HttpRefreshEndpoint {
    pub fn new(client: reqwest::Client, api_base_url: &str) -> Self {
        Self {
            client,
            url: format!("{}/auth/refresh", api_base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl RefreshEndpoint for HttpRefreshEndpoint {
    async fn refresh(&self, refresh_token: &SecretString) -> Result<RefreshedTokens, RefreshFailure> {
        let body = serde_json::json!({ "refresh_token": refresh_token.expose_secret() });

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RefreshFailure::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(RefreshFailure::Rejected(status));
        }

        let parsed: RefreshResponse = resp
            .json()
            .await
            .map_err(|e| RefreshFailure::Malformed(e.to_string()))?;

        let access_token = parsed
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| RefreshFailure::Malformed("missing access_token".to_string()))?;

        Ok(RefreshedTokens {
            access_token: SecretString::from(access_token),
            refresh_token: parsed
                .refresh_token
                .filter(|t| !t.is_empty())
                .map(SecretString::from),
            expires_in: parsed.expires_in,
            refresh_expires_in: parsed.refresh_expires_in,
        })
    }
}
