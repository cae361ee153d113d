use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tower_cookies::Cookies;

use crate::{error::AppError, services::session, state::AppState};

/// A middleware that requires a session cookie mapping to a stored token.
///
/// On success the resolved `Session` is inserted into the request
/// extensions. On failure the request is answered with 401 before any
/// upstream call is made.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `cookies` - The request cookies.
/// * `request` - The incoming request.
/// * `next` - The next middleware in the chain.
pub async fn require_session(
    State(state): State<AppState>,
    cookies: Cookies,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    tracing::debug!("🔐 Checking session...");

    let session = session::resolve(&state, &cookies).await?;
    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}
