//! Response helpers: error mapping and cookie propagation.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::auth::SESSION_EXPIRED_REDIRECT;
use crate::error::ApiError;
use crate::session::CookieTokenStore;

/// Fallback shown when the backend gives no message of its own.
pub const DEFAULT_ERROR_MESSAGE: &str = "Something went wrong. Please try again later.";

/// Map an `ApiError` to the JSON error response the UI consumes.
pub fn error_response(err: &ApiError) -> Response {
    let (status, code) = match err {
        ApiError::Network(_) => (StatusCode::BAD_GATEWAY, "network_error".to_string()),
        ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
        ApiError::Validation { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "validation_error".to_string())
        }
        ApiError::Api { status, error, .. } => (
            StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::BAD_GATEWAY),
            error.clone(),
        ),
        ApiError::Decode(_) => (StatusCode::BAD_GATEWAY, "bad_upstream_response".to_string()),
    };

    let mut body = serde_json::json!({
        "error": code,
        "message": err.user_message(DEFAULT_ERROR_MESSAGE),
    });
    match err {
        ApiError::Unauthorized => {
            body["redirect"] = serde_json::json!(SESSION_EXPIRED_REDIRECT);
        }
        ApiError::Validation { field, .. } => {
            body["details"] = serde_json::json!({ "field": field });
        }
        ApiError::Api {
            details: Some(details),
            ..
        } => {
            body["details"] = details.clone();
        }
        _ => {}
    }

    if status.is_server_error() {
        tracing::warn!(%status, "Request failed: {}", err);
    }
    (status, Json(body)).into_response()
}

/// Attach the session's queued `Set-Cookie` headers to `response`.
pub fn with_cookies(store: &CookieTokenStore, response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    store.write_to(response.headers_mut());
    response
}

/// `200 + JSON` on success, mapped error otherwise; cookies attached either way.
pub fn json_result<T: Serialize>(store: &CookieTokenStore, result: Result<T, ApiError>) -> Response {
    match result {
        Ok(value) => with_cookies(store, Json(value)),
        Err(err) => with_cookies(store, error_response(&err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unauthorized_carries_sign_in_redirect() {
        let response = error_response(&ApiError::Unauthorized);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["redirect"], "/signin?message=session_expired");
    }

    #[tokio::test]
    async fn network_error_is_bad_gateway_with_communication_message() {
        let response = error_response(&ApiError::Network("refused".into()));
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert_eq!(body["error"], "network_error");
        assert_eq!(body["message"], crate::error::COMMUNICATION_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn api_error_keeps_upstream_status_and_message() {
        let err = ApiError::from_status(
            reqwest::StatusCode::CONFLICT,
            br#"{"error":"duplicate","message":"Already logged today","details":{"id":"x"}}"#,
        );
        let response = error_response(&err);
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["error"], "duplicate");
        assert_eq!(body["message"], "Already logged today");
        assert_eq!(body["details"]["id"], "x");
    }

    #[tokio::test]
    async fn validation_error_is_unprocessable() {
        let response = error_response(&ApiError::validation("email", "Enter a valid email address"));
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert_eq!(body["details"]["field"], "email");
        assert_eq!(body["message"], "Enter a valid email address");
    }
}
