//! HTTP surface of the BFF.
//!
//! Every handler opens a request-scoped `CookieTokenStore`, talks to the
//! backend through the shared pipeline, and copies any rotated cookies onto
//! its response.

pub mod handlers;
pub mod response;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderMap, HeaderValue, Method, header};
use axum::routing::{get, post, put};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::api::AuthenticatedRequestPipeline;
use crate::config::AppConfig;
use crate::onboarding::{OnboardingManager, onboarding_routes};
use crate::session::CookieTokenStore;
use crate::session::cookie::CookieAttributes;

/// Shared state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub pipeline: Arc<AuthenticatedRequestPipeline>,
    pub onboarding: Arc<OnboardingManager>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        pipeline: AuthenticatedRequestPipeline,
        onboarding: OnboardingManager,
    ) -> Self {
        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            onboarding: Arc::new(onboarding),
        }
    }

    /// Cookie-backed token store for one incoming request.
    pub fn session(&self, headers: &HeaderMap) -> CookieTokenStore {
        CookieTokenStore::from_headers(
            headers,
            CookieAttributes {
                secure: self.config.cookie_secure,
            },
        )
    }
}

/// Build the full router.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/me", get(handlers::me))
        .route(
            "/api/daily-logs",
            get(handlers::list_daily_logs).post(handlers::create_daily_log),
        )
        .route("/api/signals", get(handlers::signals))
        .route("/api/triggers", get(handlers::triggers))
        .route("/api/triggers/selection", put(handlers::save_trigger_selection))
        .route("/api/weather", get(handlers::weather))
        .route("/api/push/subscribe", post(handlers::push_subscribe))
        .route("/api/push/unsubscribe", post(handlers::push_unsubscribe))
        .merge(onboarding_routes())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    match config
        .cors_origin
        .as_deref()
        .and_then(|origin| HeaderValue::from_str(origin).ok())
    {
        Some(origin) => base
            .allow_origin(AllowOrigin::exact(origin))
            .allow_credentials(true),
        None => base.allow_origin(AllowOrigin::mirror_request()).allow_credentials(true),
    }
}
