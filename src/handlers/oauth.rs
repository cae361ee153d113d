use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_cookies::Cookies;

use crate::{
    error::{AppError, Result},
    services::{oauth as oauth_service, session},
    state::AppState,
};

/// The query parameters of the OAuth redirect.
#[derive(Deserialize, Debug)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
}

/// The plain-text body reported for a failed callback.
fn callback_error_message(error: &AppError) -> String {
    match error {
        AppError::Configuration(msg) | AppError::BadRequest(msg) => msg.clone(),
        other => format!("OAuth failed: {}", other),
    }
}

/// Exchanges the code, stores the token and installs the session cookie.
async fn establish_session(state: &AppState, cookies: &Cookies, code: &str) -> Result<()> {
    let token = oauth_service::complete_authorization(state, code).await?;

    let cookie = session::session_cookie(&token, &state.config.cookie_domain)?;
    session::install_session_cookie(cookies, state.cookie_key.as_ref(), cookie);
    tracing::info!("✅ Session cookie added for user: {}", token.user_id);

    Ok(())
}

/// Completes the OAuth login and redirects to the dashboard.
///
/// Unlike the JSON API, failures here are reported as plain text with 400,
/// since the browser lands on this endpoint directly.
#[axum::debug_handler]
pub async fn callback(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let Some(code) = query.code.filter(|code| !code.is_empty()) else {
        tracing::warn!("❌ OAuth callback without code");
        return (StatusCode::BAD_REQUEST, "Missing authorization code.").into_response();
    };

    match establish_session(&state, &cookies, &code).await {
        Ok(()) => Redirect::to(&state.config.dashboard_url).into_response(),
        Err(e) => {
            tracing::warn!("❌ OAuth callback failed: {}", e);
            (StatusCode::BAD_REQUEST, callback_error_message(&e)).into_response()
        }
    }
}
