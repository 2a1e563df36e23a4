//! Sign-in / sign-out flows and credential validation.
//!
//! Sign-in is the only place tokens are first issued; sign-out is the only
//! place they are deleted. Refresh happens inside the request pipeline.

pub mod credentials;

pub use credentials::Credentials;

use reqwest::StatusCode;
use secrecy::ExposeSecret;

use crate::api::model::LoginResponse;
use crate::api::{ApiRequest, AuthenticatedRequestPipeline, ExecuteOptions};
use crate::error::ApiError;
use crate::session::{SessionKey, TokenStore};

/// Sign-in route with the session-expired indicator.
pub const SESSION_EXPIRED_REDIRECT: &str = "/signin?message=session_expired";

/// Where callers send the user after a terminal `Unauthorized`.
pub fn session_expired_redirect() -> &'static str {
    SESSION_EXPIRED_REDIRECT
}

/// Authenticate with the backend and store the issued tokens.
///
/// Returns the signed-in user's id.
pub async fn sign_in(
    pipeline: &AuthenticatedRequestPipeline,
    store: &dyn TokenStore,
    credentials: &Credentials,
) -> Result<String, ApiError> {
    credentials.validate()?;

    let request = ApiRequest::post("/auth/login").with_body(serde_json::json!({
        "email": credentials.email.trim(),
        "password": credentials.password.expose_secret(),
    }));

    // A 401 here means bad credentials, not an expired session.
    let outcome = pipeline
        .execute(store, &request, ExecuteOptions::without_retry())
        .await?;

    let status = outcome.status();
    if status == StatusCode::UNAUTHORIZED {
        tracing::info!("Sign-in rejected: invalid credentials");
        return Err(ApiError::Unauthorized);
    }
    let response = outcome.into_response();
    if !status.is_success() {
        let body = response.bytes().await.unwrap_or_default();
        return Err(ApiError::from_status(status, &body));
    }

    let login: LoginResponse = response
        .json()
        .await
        .map_err(|e| ApiError::Decode(e.to_string()))?;

    let policy = pipeline.policy();
    let access_max_age = policy.access_max_age(login.expires_in);
    let refresh_max_age = policy.refresh_max_age(login.refresh_expires_in);
    store.set(SessionKey::AccessToken, &login.access_token, access_max_age);
    store.set(SessionKey::RefreshToken, &login.refresh_token, refresh_max_age);
    store.set(SessionKey::UserId, &login.user.id, refresh_max_age);

    tracing::info!(user_id = %login.user.id, "Session issued");
    Ok(login.user.id)
}

/// Revoke the refresh token (best effort) and clear every session cookie.
pub async fn sign_out(pipeline: &AuthenticatedRequestPipeline, store: &dyn TokenStore) {
    if let Some(refresh_token) = store.get(SessionKey::RefreshToken) {
        let request = ApiRequest::post("/auth/logout").with_body(serde_json::json!({
            "refresh_token": refresh_token.expose_secret(),
        }));
        match pipeline
            .execute(store, &request, ExecuteOptions::without_retry())
            .await
        {
            Ok(outcome) if outcome.status().is_success() => {}
            Ok(outcome) => {
                tracing::warn!(status = %outcome.status(), "Backend logout returned an error");
            }
            Err(e) => tracing::warn!("Backend logout failed: {}", e),
        }
    }

    for key in SessionKey::ALL {
        store.clear(key);
    }
    tracing::info!("Session cleared");
}
