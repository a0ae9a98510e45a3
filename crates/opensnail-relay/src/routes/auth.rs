use axum::extract::{Query, State};
use axum::response::{Html, Redirect};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::constants::SIGNED_IN_HTML;
use crate::error::AppError;
use crate::identity::{IdentityError, IdentityProvider, UserProfile};
use crate::state::AppState;

fn provider(state: &AppState) -> Result<Arc<dyn IdentityProvider>, AppError> {
    state
        .identity
        .clone()
        .ok_or_else(|| AppError::ServiceUnavailable("Discord sign-in is not configured".into()))
}

/// GET /auth/discord
/// Sends the browser to the Discord consent page.
pub async fn login(State(state): State<AppState>) -> Result<Redirect, AppError> {
    let provider = provider(&state)?;
    info!("Discord sign-in initiated");
    Ok(Redirect::to(&provider.authorize_url()))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    code: Option<String>,
    error: Option<String>,
}

/// GET /auth/discord/callback?code=...
/// Exchanges the code and stores the token in the shared slot.
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Result<Html<&'static str>, AppError> {
    let provider = provider(&state)?;

    if let Some(reason) = params.error {
        warn!(reason = %reason, "Discord sign-in cancelled");
        return Err(AppError::BadRequest(format!("Sign-in cancelled: {}", reason)));
    }
    let code = params
        .code
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".into()))?;

    let token = provider.exchange_code(&code).await.map_err(|e| {
        error!(error = %e, "Discord code exchange failed");
        AppError::from(e)
    })?;

    state.access_token.set(token).await;
    info!("Discord sign-in completed");

    Ok(Html(SIGNED_IN_HTML))
}

/// GET /api/userdata
/// Returns `{ username, profile_picture }` for the signed-in user.
pub async fn userdata(State(state): State<AppState>) -> Result<Json<UserProfile>, AppError> {
    let provider = provider(&state)?;
    let token = state.access_token.get().await.ok_or(AppError::Unauthorized)?;

    match provider.fetch_profile(&token).await {
        Ok(profile) => Ok(Json(profile)),
        Err(IdentityError::Rejected(msg)) => {
            warn!(error = %msg, "Stored access token rejected, clearing it");
            state.access_token.clear().await;
            Err(AppError::Unauthorized)
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /auth/logout
/// Clears the shared token and returns `{ success: true }`.
pub async fn logout(State(state): State<AppState>) -> Json<Value> {
    if state.access_token.clear().await {
        info!("Logout");
    }
    Json(json!({ "success": true }))
}
