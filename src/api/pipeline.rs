//! Authenticated request pipeline with transparent token refresh.
//!
//! Per `execute` call:
//!
//! ```text
//! SENT ── non-401 ─────────────────────────────────────▶ Direct
//!   └── 401 ── retry disabled ─────────────────────────▶ RetryDisabled
//!          └── REFRESHING ── ok ──▶ RESENT ────────────▶ Refreshed
//!                         └── failed ──────────────────▶ RefreshFailed (R1 returned)
//! ```
//!
//! At most two calls reach the target endpoint and at most one reaches the
//! refresh endpoint. Nothing is carried between calls; each `execute` reads
//! the token store afresh.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::session::{SessionKey, TokenPolicy, TokenStore};

use super::refresh::{HttpRefreshEndpoint, RefreshEndpoint, RefreshFailure};

/// Header carrying a per-call correlation id.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Description of one backend call. Cloned for the post-refresh retry.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL, e.g. `/daily-logs`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Per-call options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Refresh and retry once when the first response is 401.
    pub retry_on_unauthorized: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            retry_on_unauthorized: true,
        }
    }
}

impl ExecuteOptions {
    pub fn without_retry() -> Self {
        Self {
            retry_on_unauthorized: false,
        }
    }
}

/// How the returned response was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionPath {
    /// First response was not a 401.
    Direct,
    /// First response was a 401 and retry was disabled.
    RetryDisabled,
    /// Tokens were refreshed and the response is from the second attempt.
    Refreshed,
    /// Refresh failed; the response is the original 401.
    RefreshFailed(RefreshFailure),
}

/// Response plus the path that produced it.
#[derive(Debug)]
pub struct PipelineResponse {
    response: reqwest::Response,
    path: ExecutionPath,
}

impl PipelineResponse {
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn path(&self) -> &ExecutionPath {
        &self.path
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == StatusCode::UNAUTHORIZED
    }

    /// Terminal unauthorized: callers should send the user to sign-in.
    pub fn session_expired(&self) -> bool {
        self.is_unauthorized()
    }

    pub fn into_response(self) -> reqwest::Response {
        self.response
    }

    pub async fn json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        self.response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

/// Wraps backend calls with bearer auth and a single refresh-and-retry.
pub struct AuthenticatedRequestPipeline {
    client: reqwest::Client,
    base_url: String,
    refresher: Arc<dyn RefreshEndpoint>,
    policy: TokenPolicy,
}

impl AuthenticatedRequestPipeline {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        refresher: Arc<dyn RefreshEndpoint>,
        policy: TokenPolicy,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            refresher,
            policy,
        }
    }

    /// Build a pipeline talking to `config.api_base_url` with the configured
    /// timeout and the HTTP refresh endpoint.
    pub fn from_config(config: &AppConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to build HTTP client: {e}")))?;
        let refresher = Arc::new(HttpRefreshEndpoint::new(client.clone(), &config.api_base_url));
        Ok(Self::new(
            client,
            config.api_base_url.clone(),
            refresher,
            TokenPolicy::from(config),
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn policy(&self) -> TokenPolicy {
        self.policy
    }

    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Send `request`, refreshing credentials and retrying once on 401.
    ///
    /// HTTP error statuses are returned, never raised. Only transport
    /// failures on the target endpoint surface as `ApiError::Network`.
    pub async fn execute(
        &self,
        store: &dyn TokenStore,
        request: &ApiRequest,
        options: ExecuteOptions,
    ) -> Result<PipelineResponse, ApiError> {
        let request_id = Uuid::new_v4();
        let access_token = store.get(SessionKey::AccessToken);

        let first = self
            .send(request, access_token.as_ref(), request_id, 1)
            .await?;

        if first.status() != StatusCode::UNAUTHORIZED {
            return Ok(PipelineResponse {
                response: first,
                path: ExecutionPath::Direct,
            });
        }

        if !options.retry_on_unauthorized {
            return Ok(PipelineResponse {
                response: first,
                path: ExecutionPath::RetryDisabled,
            });
        }

        match self.refresh(store).await {
            Ok(new_access) => {
                tracing::info!(%request_id, path = %request.path, "Access token refreshed; retrying request");
                let second = self.send(request, Some(&new_access), request_id, 2).await?;
                Ok(PipelineResponse {
                    response: second,
                    path: ExecutionPath::Refreshed,
                })
            }
            Err(failure) => {
                tracing::warn!(%request_id, path = %request.path, "Token refresh failed: {}", failure);
                Ok(PipelineResponse {
                    response: first,
                    path: ExecutionPath::RefreshFailed(failure),
                })
            }
        }
    }

    /// Exchange the stored refresh token and persist what comes back.
    async fn refresh(&self, store: &dyn TokenStore) -> Result<SecretString, RefreshFailure> {
        let refresh_token = store
            .get(SessionKey::RefreshToken)
            .ok_or(RefreshFailure::MissingRefreshToken)?;

        let tokens = self.refresher.refresh(&refresh_token).await?;

        store.set(
            SessionKey::AccessToken,
            tokens.access_token.expose_secret(),
            self.policy.access_max_age(tokens.expires_in),
        );
        if let Some(rotated) = &tokens.refresh_token {
            store.set(
                SessionKey::RefreshToken,
                rotated.expose_secret(),
                self.policy.refresh_max_age(tokens.refresh_expires_in),
            );
        }

        Ok(tokens.access_token)
    }

    async fn send(
        &self,
        request: &ApiRequest,
        access_token: Option<&SecretString>,
        request_id: Uuid,
        attempt: u8,
    ) -> Result<reqwest::Response, ApiError> {
        let mut builder = self
            .client
            .request(request.method.clone(), self.url(&request.path))
            .header(REQUEST_ID_HEADER, request_id.to_string());

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = access_token {
            builder = builder.bearer_auth(token.expose_secret());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        tracing::debug!(
            %request_id,
            method = %request.method,
            path = %request.path,
            attempt,
            authenticated = access_token.is_some(),
            "Sending API request"
        );

        builder.send().await.map_err(|e| {
            tracing::warn!(%request_id, path = %request.path, attempt, "API request failed: {}", e);
            ApiError::Network(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::super::refresh::RefreshedTokens;
    use super::*;

    struct NeverRefresh;

    #[async_trait]
    impl RefreshEndpoint for NeverRefresh {
        async fn refresh(&self, _token: &SecretString) -> Result<RefreshedTokens, RefreshFailure> {
            Err(RefreshFailure::Rejected(StatusCode::UNAUTHORIZED))
        }
    }

    fn pipeline(base: &str) -> AuthenticatedRequestPipeline {
        AuthenticatedRequestPipeline::new(
            reqwest::Client::new(),
            base,
            Arc::new(NeverRefresh),
            TokenPolicy::default(),
        )
    }

    #[test]
    fn url_joins_paths_with_single_slash() {
        let p = pipeline("http://api.local/v1/");
        assert_eq!(p.base_url(), "http://api.local/v1");
        assert_eq!(p.url("/signals"), "http://api.local/v1/signals");
        assert_eq!(p.url("signals"), "http://api.local/v1/signals");
    }

    #[test]
    fn request_builder_accumulates_parts() {
        let req = ApiRequest::get("/weather")
            .with_query("prefecture_code", "13")
            .with_header("User-Id", "u1")
            .with_body(serde_json::json!({"a": 1}));
        assert_eq!(req.method, Method::GET);
        assert_eq!(req.query, vec![("prefecture_code".to_string(), "13".to_string())]);
        assert_eq!(req.headers, vec![("User-Id".to_string(), "u1".to_string())]);
        assert!(req.body.is_some());
    }

    #[test]
    fn retry_is_on_by_default() {
        assert!(ExecuteOptions::default().retry_on_unauthorized);
        assert!(!ExecuteOptions::without_retry().retry_on_unauthorized);
    }

    #[tokio::test]
    async fn transport_failure_is_network_error() {
        // Bind then drop a listener so the port is known to be closed.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let p = pipeline(&format!("http://127.0.0.1:{port}"));
        let store = crate::session::MemoryTokenStore::with_tokens(Some("a"), Some("r"));
        let err = p
            .execute(&store, &ApiRequest::get("/signals"), ExecuteOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_network(), "expected network error, got {err:?}");
    }
}
