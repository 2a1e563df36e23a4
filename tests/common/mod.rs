//! Stub backend shared by the integration tests.
//!
//! A real Axum server on a random port that mimics the backend API closely
//! enough to exercise the pipeline and the BFF routes, counting every call.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use health_companion::api::{AuthenticatedRequestPipeline, HttpRefreshEndpoint};
use health_companion::config::AppConfig;
use health_companion::session::TokenPolicy;

/// Maximum time any test is allowed to run before we consider it hung.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// The only access token the stub accepts.
pub const VALID_ACCESS: &str = "fresh-access";
/// Password the stub's login endpoint accepts.
pub const VALID_PASSWORD: &str = "correct-horse";

/// How `POST /auth/refresh` behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// New access token plus a rotated refresh token, with lifetimes.
    Rotate,
    /// New access token only, no lifetimes.
    AccessOnly,
    /// 401 from the refresh endpoint.
    Reject,
    /// 200 without an access token.
    Malformed,
}

pub struct Backend {
    pub protected_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub push_registrations: AtomicUsize,
    /// Every request to a protected endpoint answers 401.
    pub always_unauthorized: AtomicBool,
    pub refresh_mode: Mutex<RefreshMode>,
    pub prefecture_code: Mutex<Option<u8>>,
    pub last_authorization: Mutex<Option<String>>,
    pub last_user_id: Mutex<Option<String>>,
    pub last_refresh_token: Mutex<Option<String>>,
}

impl Default for Backend {
    fn default() -> Self {
        Self {
            protected_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            push_registrations: AtomicUsize::new(0),
            always_unauthorized: AtomicBool::new(false),
            refresh_mode: Mutex::new(RefreshMode::Rotate),
            prefecture_code: Mutex::new(None),
            last_authorization: Mutex::new(None),
            last_user_id: Mutex::new(None),
            last_refresh_token: Mutex::new(None),
        }
    }
}

impl Backend {
    pub fn protected_calls(&self) -> usize {
        self.protected_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn set_refresh_mode(&self, mode: RefreshMode) {
        *self.refresh_mode.lock().unwrap() = mode;
    }

    pub fn set_prefecture(&self, code: Option<u8>) {
        *self.prefecture_code.lock().unwrap() = code;
    }

    pub fn last_user_id(&self) -> Option<String> {
        self.last_user_id.lock().unwrap().clone()
    }

    pub fn last_authorization(&self) -> Option<String> {
        self.last_authorization.lock().unwrap().clone()
    }

    /// Record request headers and decide whether the bearer token is valid.
    fn authorize(&self, headers: &HeaderMap) -> bool {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let user_id = headers
            .get("user-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        *self.last_user_id.lock().unwrap() = user_id;
        *self.last_authorization.lock().unwrap() = authorization.clone();

        !self.always_unauthorized.load(Ordering::SeqCst)
            && authorization.as_deref() == Some(&format!("Bearer {VALID_ACCESS}"))
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "unauthorized", "message": "Token expired"})),
    )
        .into_response()
}

async fn protected(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    b.protected_calls.fetch_add(1, Ordering::SeqCst);
    if !b.authorize(&headers) {
        return unauthorized();
    }
    Json(json!({"ok": true})).into_response()
}

async fn public(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    b.authorize(&headers);
    Json(json!({"public": true})).into_response()
}

async fn conflict(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    if !b.authorize(&headers) {
        return unauthorized();
    }
    (
        StatusCode::CONFLICT,
        Json(json!({"error": "duplicate", "message": "Already logged today"})),
    )
        .into_response()
}

async fn refresh(State(b): State<Arc<Backend>>, Json(body): Json<Value>) -> Response {
    b.refresh_calls.fetch_add(1, Ordering::SeqCst);
    *b.last_refresh_token.lock().unwrap() =
        body.get("refresh_token").and_then(|v| v.as_str()).map(String::from);

    let mode = *b.refresh_mode.lock().unwrap();
    match mode {
        RefreshMode::Rotate => Json(json!({
            "access_token": VALID_ACCESS,
            "refresh_token": "refresh-2",
            "expires_in": 600,
            "refresh_expires_in": 86400,
        }))
        .into_response(),
        RefreshMode::AccessOnly => Json(json!({"access_token": VALID_ACCESS})).into_response(),
        RefreshMode::Reject => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid_refresh_token", "message": "Refresh token revoked"})),
        )
            .into_response(),
        RefreshMode::Malformed => Json(json!({"token_type": "bearer"})).into_response(),
    }
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["password"] != VALID_PASSWORD {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "invalid_credentials", "message": "Bad credentials"})),
        )
            .into_response();
    }
    Json(json!({
        "access_token": VALID_ACCESS,
        "refresh_token": "refresh-1",
        "expires_in": 900,
        "user": {"id": "user-1", "email": body["email"]},
    }))
    .into_response()
}

async fn logout(State(b): State<Arc<Backend>>) -> StatusCode {
    b.logout_calls.fetch_add(1, Ordering::SeqCst);
    StatusCode::NO_CONTENT
}

async fn me(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    if !b.authorize(&headers) {
        return unauthorized();
    }
    let prefecture = *b.prefecture_code.lock().unwrap();
    Json(json!({
        "id": "user-1",
        "email": "user@example.com",
        "prefecture_code": prefecture,
        "concern_topics": [],
        "notification_enabled": false,
    }))
    .into_response()
}

async fn update_prefecture(
    State(b): State<Arc<Backend>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !b.authorize(&headers) {
        return unauthorized();
    }
    let code = body["prefecture_code"].as_u64().map(|c| c as u8);
    *b.prefecture_code.lock().unwrap() = code;
    StatusCode::NO_CONTENT.into_response()
}

async fn accept_authorized(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    if !b.authorize(&headers) {
        return unauthorized();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn register_push(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    if !b.authorize(&headers) {
        return unauthorized();
    }
    b.push_registrations.fetch_add(1, Ordering::SeqCst);
    StatusCode::CREATED.into_response()
}

async fn signals(State(b): State<Arc<Backend>>, headers: HeaderMap) -> Response {
    if !b.authorize(&headers) {
        return unauthorized();
    }
    Json(json!([{
        "id": "s1",
        "kind": "pressure_drop",
        "level": "high",
        "message": "Pressure is dropping fast",
        "observed_at": "2024-05-01T09:00:00Z",
    }]))
    .into_response()
}

/// Start the stub backend on a random port; returns (base_url, backend).
pub async fn start_backend() -> (String, Arc<Backend>) {
    let backend = Arc::new(Backend::default());
    let app = Router::new()
        .route("/protected", get(protected))
        .route("/public", get(public))
        .route("/conflict", get(conflict))
        .route("/auth/refresh", post(refresh))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/users/me", get(me))
        .route("/users/me/prefecture", put(update_prefecture))
        .route("/users/me/concern-topics", put(accept_authorized))
        .route("/users/me/triggers", put(accept_authorized))
        .route("/push/subscriptions", post(register_push))
        .route("/signals", get(signals))
        .with_state(Arc::clone(&backend));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://127.0.0.1:{port}"), backend)
}

pub fn config_for(base_url: &str) -> AppConfig {
    AppConfig {
        api_base_url: base_url.to_string(),
        request_timeout: Duration::from_secs(2),
        ..AppConfig::default()
    }
}

pub fn pipeline_for(base_url: &str) -> AuthenticatedRequestPipeline {
    AuthenticatedRequestPipeline::from_config(&config_for(base_url)).unwrap()
}

/// Pipeline whose target calls go to `base_url` but whose refresh calls go
/// to `refresh_base_url`.
pub fn pipeline_with_refresh_at(base_url: &str, refresh_base_url: &str) -> AuthenticatedRequestPipeline {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let refresher = Arc::new(HttpRefreshEndpoint::new(client.clone(), refresh_base_url));
    AuthenticatedRequestPipeline::new(client, base_url, refresher, TokenPolicy::default())
}

/// Base URL of a port nothing listens on.
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}
