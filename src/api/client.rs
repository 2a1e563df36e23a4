//! Typed backend client on top of the request pipeline.

use chrono::NaiveDate;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::push::PushSubscription;
use crate::session::{SessionKey, TokenStore};

use super::model::{
    DailyLog, NewDailyLog, Signal, Trigger, UserProfile, WeatherForecast,
    normalize_concern_topics, validate_prefecture_code,
};
use super::pipeline::{ApiRequest, AuthenticatedRequestPipeline, ExecuteOptions, ExecutionPath};
use super::refresh::RefreshFailure;

/// Header identifying the authenticated subject on user-scoped endpoints.
pub const USER_ID_HEADER: &str = "User-Id";

/// Backend client bound to one session's token store.
pub struct ApiClient<'a> {
    pipeline: &'a AuthenticatedRequestPipeline,
    store: &'a dyn TokenStore,
    user_id: Option<String>,
}

impl<'a> ApiClient<'a> {
    /// Create a client; the user id is taken from the session when present.
    pub fn new(pipeline: &'a AuthenticatedRequestPipeline, store: &'a dyn TokenStore) -> Self {
        let user_id = store
            .get(SessionKey::UserId)
            .map(|id| id.expose_secret().to_string());
        Self {
            pipeline,
            store,
            user_id,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    // ── Users ───────────────────────────────────────────────────────

    pub async fn me(&self) -> Result<UserProfile, ApiError> {
        self.send_json(ApiRequest::get("/users/me")).await
    }

    pub async fn update_prefecture(&self, prefecture_code: u8) -> Result<(), ApiError> {
        validate_prefecture_code(prefecture_code)?;
        let request = ApiRequest::put("/users/me/prefecture")
            .with_body(serde_json::json!({ "prefecture_code": prefecture_code }));
        self.send_empty(request).await
    }

    pub async fn update_concern_topics(&self, topics: &[String]) -> Result<Vec<String>, ApiError> {
        let topics = normalize_concern_topics(topics)?;
        let request = ApiRequest::put("/users/me/concern-topics")
            .with_body(serde_json::json!({ "topics": topics }));
        self.send_empty(request).await?;
        Ok(topics)
    }

    // ── Daily logs ──────────────────────────────────────────────────

    pub async fn daily_logs(&self, date: NaiveDate) -> Result<Vec<DailyLog>, ApiError> {
        let request =
            ApiRequest::get("/daily-logs").with_query("date", date.format("%Y-%m-%d").to_string());
        self.send_json(request).await
    }

    pub async fn create_daily_log(&self, log: &NewDailyLog) -> Result<DailyLog, ApiError> {
        log.validate()?;
        let body = serde_json::to_value(log).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.send_json(ApiRequest::post("/daily-logs").with_body(body))
            .await
    }

    // ── Signals, triggers, weather ──────────────────────────────────

    pub async fn signals(&self) -> Result<Vec<Signal>, ApiError> {
        self.send_json(ApiRequest::get("/signals")).await
    }

    pub async fn triggers(&self) -> Result<Vec<Trigger>, ApiError> {
        self.send_json(ApiRequest::get("/triggers")).await
    }

    pub async fn save_trigger_selection(&self, trigger_ids: &[String]) -> Result<(), ApiError> {
        let request = ApiRequest::put("/users/me/triggers")
            .with_body(serde_json::json!({ "trigger_ids": trigger_ids }));
        self.send_empty(request).await
    }

    pub async fn weather(&self, prefecture_code: u8) -> Result<WeatherForecast, ApiError> {
        validate_prefecture_code(prefecture_code)?;
        let request =
            ApiRequest::get("/weather").with_query("prefecture_code", prefecture_code.to_string());
        self.send_json(request).await
    }

    // ── Push ────────────────────────────────────────────────────────

    pub async fn register_push_subscription(
        &self,
        subscription: &PushSubscription,
    ) -> Result<(), ApiError> {
        subscription.validate()?;
        let body =
            serde_json::to_value(subscription).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.send_empty(ApiRequest::post("/push/subscriptions").with_body(body))
            .await
    }

    pub async fn unregister_push_subscription(&self, endpoint: &str) -> Result<(), ApiError> {
        let request = ApiRequest::delete("/push/subscriptions")
            .with_body(serde_json::json!({ "endpoint": endpoint }));
        self.send_empty(request).await
    }

    // ── Plumbing ────────────────────────────────────────────────────

    /// Execute and decode a JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = self.execute(request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// Execute and discard the body.
    pub async fn send_empty(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.execute(request).await.map(|_| ())
    }

    async fn execute(&self, request: ApiRequest) -> Result<reqwest::Response, ApiError> {
        let request = match &self.user_id {
            Some(id) => request.with_header(USER_ID_HEADER, id.as_str()),
            None => request,
        };

        let outcome = self
            .pipeline
            .execute(self.store, &request, ExecuteOptions::default())
            .await?;

        // An unreachable refresh endpoint is a communication error, not a logout.
        if let ExecutionPath::RefreshFailed(RefreshFailure::Network(message)) = outcome.path() {
            return Err(ApiError::Network(message.clone()));
        }

        let status = outcome.status();
        if status == StatusCode::UNAUTHORIZED {
            tracing::info!(path = %request.path, "Session expired: {:?}", outcome.path());
            return Err(ApiError::Unauthorized);
        }

        let response = outcome.into_response();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }
        Ok(response)
    }
}
