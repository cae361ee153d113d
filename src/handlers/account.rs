use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
    Extension,
};
use tower_cookies::Cookies;

use crate::{
    error::Result,
    models::session::Session,
    response,
    services::session as session_service,
    state::AppState,
};

/// Returns the logged-in user's upstream profile.
#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response> {
    tracing::debug!("👤 Profile for user: {}", session.user_id);
    let user = state.nestrip.user_info(&session.access_token).await?;
    Ok(response::json(StatusCode::OK, &user))
}

/// Returns a user's public profile.
///
/// Works without a session; when one resolves, its token is attached so
/// the upstream can apply the viewer's visibility rules.
#[axum::debug_handler]
pub async fn user_profile(
    State(state): State<AppState>,
    cookies: Cookies,
    Path(user_id): Path<String>,
) -> Result<Response> {
    let session = session_service::resolve_optional(&state, &cookies).await?;
    let token = session.as_ref().map(|s| s.access_token.as_str());

    let profile = state.nestrip.user_profile(&user_id, token).await?;
    Ok(response::json(StatusCode::OK, &profile))
}
