//! REST endpoints for the onboarding wizard.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::push::{BrowserPushSubscription, PushSubscription};
use crate::web::AppState;
use crate::web::response::{error_response, json_result, with_cookies};

use super::manager::OnboardingStatus;
use super::model::{DASHBOARD_ROUTE, StepKey};
use super::state::WizardAction;

fn wizard_missing() -> ApiError {
    ApiError::Api {
        status: StatusCode::NOT_FOUND,
        error: "onboarding_not_found".to_string(),
        message: "Onboarding session has expired. Please reload the page.".to_string(),
        details: None,
    }
}

fn found(status: Option<OnboardingStatus>) -> Result<OnboardingStatus, ApiError> {
    status.ok_or_else(wizard_missing)
}

/// Run a navigation action against the caller's wizard.
async fn navigate(state: &AppState, headers: &HeaderMap, action: WizardAction) -> Response {
    let store = state.session(headers);
    let client = ApiClient::new(&state.pipeline, &store);
    let result = match state.onboarding.ensure_wizard(&client).await {
        Ok(user_id) => found(state.onboarding.dispatch(&user_id, action).await),
        Err(e) => Err(e),
    };
    json_result(&store, result)
}

/// GET /api/onboarding
async fn get_status(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let store = state.session(&headers);
    let client = ApiClient::new(&state.pipeline, &store);
    let result = match state.onboarding.ensure_wizard(&client).await {
        Ok(user_id) => found(state.onboarding.status(&user_id).await),
        Err(e) => Err(e),
    };
    json_result(&store, result)
}

/// POST /api/onboarding/start
async fn start(State(state): State<AppState>, headers: HeaderMap) -> Response {
    navigate(&state, &headers, WizardAction::Start).await
}

/// POST /api/onboarding/back
async fn go_back(State(state): State<AppState>, headers: HeaderMap) -> Response {
    navigate(&state, &headers, WizardAction::GoBack).await
}

/// POST /api/onboarding/go-to/{index}
async fn go_to_step(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(index): Path<usize>,
) -> Response {
    navigate(&state, &headers, WizardAction::GoToStep(index)).await
}

/// POST /api/onboarding/steps/{key}/skip
///
/// Required steps are refused here; the wizard itself would accept the skip.
async fn skip_step(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Response {
    let store = state.session(&headers);
    let key: StepKey = match key.parse() {
        Ok(key) => key,
        Err(message) => {
            return with_cookies(&store, error_response(&ApiError::validation("step", message)));
        }
    };

    let client = ApiClient::new(&state.pipeline, &store);
    let user_id = match state.onboarding.ensure_wizard(&client).await {
        Ok(user_id) => user_id,
        Err(e) => return with_cookies(&store, error_response(&e)),
    };

    let skippable = state
        .onboarding
        .wizard(&user_id)
        .await
        .map(|w| w.is_skippable(key))
        .unwrap_or(false);
    let result = if skippable {
        found(
            state
                .onboarding
                .dispatch(&user_id, WizardAction::SkipStep(key))
                .await,
        )
    } else {
        Err(ApiError::validation("step", format!("The {key} step cannot be skipped")))
    };
    json_result(&store, result)
}

#[derive(Debug, Deserialize)]
struct PrefectureBody {
    prefecture_code: u8,
}

/// PUT /api/onboarding/prefecture
async fn save_prefecture(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<PrefectureBody>,
) -> Response {
    let store = state.session(&headers);
    let client = ApiClient::new(&state.pipeline, &store);
    let result = match state.onboarding.ensure_wizard(&client).await {
        Ok(user_id) => state
            .onboarding
            .save_prefecture(&client, &user_id, body.prefecture_code)
            .await
            .and_then(found),
        Err(e) => Err(e),
    };
    json_result(&store, result)
}

#[derive(Debug, Deserialize)]
struct ConcernTopicsBody {
    topics: Vec<String>,
}

/// PUT /api/onboarding/concern-topics
async fn save_concern_topics(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ConcernTopicsBody>,
) -> Response {
    let store = state.session(&headers);
    let client = ApiClient::new(&state.pipeline, &store);
    let result = match state.onboarding.ensure_wizard(&client).await {
        Ok(user_id) => state
            .onboarding
            .save_concern_topics(&client, &user_id, &body.topics)
            .await
            .and_then(found),
        Err(e) => Err(e),
    };
    json_result(&store, result)
}

/// POST /api/onboarding/notification
async fn enable_notifications(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<BrowserPushSubscription>,
) -> Response {
    let store = state.session(&headers);
    let client = ApiClient::new(&state.pipeline, &store);
    let subscription = PushSubscription::from(body);
    let result = match state.onboarding.ensure_wizard(&client).await {
        Ok(user_id) => state
            .onboarding
            .enable_notifications(&client, &user_id, &subscription)
            .await
            .and_then(found),
        Err(e) => Err(e),
    };
    json_result(&store, result)
}

/// POST /api/onboarding/dashboard
///
/// Answers with the dashboard redirect for any signed-in user, wizard or not.
async fn go_to_dashboard(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let store = state.session(&headers);
    let client = ApiClient::new(&state.pipeline, &store);
    let user_id = match state.onboarding.authenticated_user(&client).await {
        Ok(user_id) => user_id,
        Err(e) => return with_cookies(&store, error_response(&e)),
    };
    state
        .onboarding
        .dispatch(&user_id, WizardAction::GoToDashboard)
        .await;
    with_cookies(
        &store,
        Json(serde_json::json!({ "redirect": DASHBOARD_ROUTE })),
    )
}

/// Build the onboarding REST routes.
pub fn onboarding_routes() -> Router<AppState> {
    Router::new()
        .route("/api/onboarding", get(get_status))
        .route("/api/onboarding/start", post(start))
        .route("/api/onboarding/back", post(go_back))
        .route("/api/onboarding/go-to/{index}", post(go_to_step))
        .route("/api/onboarding/steps/{key}/skip", post(skip_step))
        .route("/api/onboarding/prefecture", put(save_prefecture))
        .route("/api/onboarding/concern-topics", put(save_concern_topics))
        .route("/api/onboarding/notification", post(enable_notifications))
        .route("/api/onboarding/dashboard", post(go_to_dashboard))
}
