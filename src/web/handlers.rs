//! Auth and data route handlers.

use axum::Json;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::api::ApiClient;
use crate::api::model::NewDailyLog;
use crate::auth::{self, Credentials};
use crate::error::ApiError;
use crate::push::{BrowserPushSubscription, PushSubscription};

use super::AppState;
use super::response::{error_response, json_result, with_cookies};

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ── Auth ────────────────────────────────────────────────────────────────

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(credentials): Json<Credentials>,
) -> Response {
    let store = state.session(&headers);
    match auth::sign_in(&state.pipeline, &store, &credentials).await {
        Ok(user_id) => with_cookies(
            &store,
            Json(serde_json::json!({ "user_id": user_id, "redirect": "/dashboard" })),
        ),
        // Bad credentials, not an expired session: no sign-in redirect.
        Err(ApiError::Unauthorized) => with_cookies(
            &store,
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({
                    "error": "invalid_credentials",
                    "message": "Email address or password is incorrect.",
                })),
            ),
        ),
        Err(e) => with_cookies(&store, error_response(&e)),
    }
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let store = state.session(&headers);
    auth::sign_out(&state.pipeline, &store).await;
    with_cookies(&store, Json(serde_json::json!({ "redirect": "/signin" })))
}

// ── User & daily logs ───────────────────────────────────────────────────

/// GET /api/me
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let store = state.session(&headers);
    let client = ApiClient::new(&state.pipeline, &store);
    let result = client.me().await;
    json_result(&store, result)
}

#[derive(Debug, Deserialize)]
pub struct DailyLogQuery {
    pub date: Option<NaiveDate>,
}

/// GET /api/daily-logs?date=YYYY-MM-DD (defaults to today, UTC)
pub async fn list_daily_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DailyLogQuery>,
) -> Response {
    let store = state.session(&headers);
    let client = ApiClient::new(&state.pipeline, &store);
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let result = client.daily_logs(date).await;
    json_result(&store, result)
}

/// POST /api/daily-logs
pub async fn create_daily_log(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(log): Json<NewDailyLog>,
) -> Response {
    let store = state.session(&headers);
    let client = ApiClient::new(&state.pipeline, &store);
    match client.create_daily_log(&log).await {
        Ok(created) => with_cookies(&store, (StatusCode::CREATED, Json(created))),
        Err(e) => with_cookies(&store, error_response(&e)),
    }
}

// ── Signals, triggers, weather ──────────────────────────────────────────

/// GET /api/signals
pub async fn signals(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let store = state.session(&headers);
    let client = ApiClient::new(&state.pipeline, &store);
    let result = client.signals().await;
    json_result(&store, result)
}

/// GET /api/triggers
pub async fn triggers(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let store = state.session(&headers);
    let client = ApiClient::new(&state.pipeline, &store);
    let result = client.triggers().await;
    json_result(&store, result)
}

#[derive(Debug, Deserialize)]
pub struct TriggerSelection {
    pub trigger_ids: Vec<String>,
}

/// PUT /api/triggers/selection
pub async fn save_trigger_selection(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(selection): Json<TriggerSelection>,
) -> Response {
    let store = state.session(&headers);
    let client = ApiClient::new(&state.pipeline, &store);
    let result = client
        .save_trigger_selection(&selection.trigger_ids)
        .await
        .map(|()| serde_json::json!({ "saved": selection.trigger_ids.len() }));
    json_result(&store, result)
}

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub prefecture_code: Option<u8>,
}

/// GET /api/weather?prefecture_code=N (defaults to the user's prefecture)
pub async fn weather(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WeatherQuery>,
) -> Response {
    let store = state.session(&headers);
    let client = ApiClient::new(&state.pipeline, &store);

    let code = match query.prefecture_code {
        Some(code) => Ok(code),
        None => client.me().await.and_then(|profile| {
            profile.prefecture_code.ok_or_else(|| {
                ApiError::validation("prefecture_code", "Set your prefecture to see the weather")
            })
        }),
    };
    let result = match code {
        Ok(code) => client.weather(code).await,
        Err(e) => Err(e),
    };
    json_result(&store, result)
}

// ── Push ────────────────────────────────────────────────────────────────

/// POST /api/push/subscribe with the browser's `PushSubscription.toJSON()` body.
pub async fn push_subscribe(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(subscription): Json<BrowserPushSubscription>,
) -> Response {
    let store = state.session(&headers);
    let client = ApiClient::new(&state.pipeline, &store);
    let subscription = PushSubscription::from(subscription);
    let result = client
        .register_push_subscription(&subscription)
        .await
        .map(|()| serde_json::json!({ "subscribed": true }));
    json_result(&store, result)
}

#[derive(Debug, Deserialize)]
pub struct PushUnsubscribe {
    pub endpoint: String,
}

/// POST /api/push/unsubscribe
pub async fn push_unsubscribe(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<PushUnsubscribe>,
) -> Response {
    let store = state.session(&headers);
    let client = ApiClient::new(&state.pipeline, &store);
    let result = client
        .unregister_push_subscription(&body.endpoint)
        .await
        .map(|()| serde_json::json!({ "subscribed": false }));
    json_result(&store, result)
}
