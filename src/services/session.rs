use tower_cookies::cookie::time::{Duration, OffsetDateTime};
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies, Key};

use crate::{
    error::{AppError, Result},
    models::{session::Session, token::StoredToken},
    state::AppState,
};

/// Name of the cookie correlating a browser to a stored token.
pub const SESSION_COOKIE: &str = "NestRipUserId";

/// When the session cookie for `token` expires: now plus `expires_in`.
///
/// Fails when the lifetime overflows the cookie date range.
pub fn cookie_expiry(token: &StoredToken) -> Result<OffsetDateTime> {
    OffsetDateTime::now_utc()
        .checked_add(Duration::seconds(token.expires_in))
        .ok_or_else(|| AppError::Internal(format!("Token lifetime out of range: {}s", token.expires_in)))
}

/// Builds the session cookie for a freshly stored token.
///
/// The dashboard lives on another origin, so the cookie must be
/// `SameSite=None` (which in turn requires `Secure`).
pub fn session_cookie(token: &StoredToken, domain: &str) -> Result<Cookie<'static>> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token.user_id.clone());
    cookie.set_http_only(true);
    cookie.set_secure(true);
    cookie.set_same_site(SameSite::None);
    cookie.set_path("/");
    if !domain.is_empty() {
        cookie.set_domain(domain.to_string());
    }
    cookie.set_expires(cookie_expiry(token)?);
    Ok(cookie)
}

/// Adds the session cookie to the response, signing it when a key is set.
pub fn install_session_cookie(cookies: &Cookies, key: Option<&Key>, cookie: Cookie<'static>) {
    match key {
        Some(key) => cookies.signed(key).add(cookie),
        None => cookies.add(cookie),
    }
}

/// Whether the request carries a session cookie at all, valid or not.
pub fn has_session_cookie(cookies: &Cookies) -> bool {
    cookies.get(SESSION_COOKIE).is_some()
}

/// Reads the user id from the session cookie.
///
/// Returns `None` when the cookie is absent, empty, or (in signed mode)
/// carries a bad signature.
pub fn session_user_id(cookies: &Cookies, key: Option<&Key>) -> Option<String> {
    let cookie = match key {
        Some(key) => cookies.signed(key).get(SESSION_COOKIE),
        None => cookies.get(SESSION_COOKIE),
    }?;

    let user_id = cookie.value();
    if user_id.is_empty() {
        return None;
    }
    Some(user_id.to_string())
}

/// Resolves the session cookie into the stored access token.
///
/// No expiry check is made: an expired token is still handed to the
/// upstream, which rejects it itself.
///
/// # Returns
///
/// The `Session`, or `AppError::Unauthenticated` when there is no cookie or
/// no token record for it.
pub async fn resolve(state: &AppState, cookies: &Cookies) -> Result<Session> {
    let user_id = session_user_id(cookies, state.cookie_key.as_ref()).ok_or_else(|| {
        tracing::debug!("❌ No usable {} cookie", SESSION_COOKIE);
        AppError::Unauthenticated
    })?;

    let token = state
        .tokens
        .find_by_user_id(&user_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!("❌ No token record for session user: {}", user_id);
            AppError::Unauthenticated
        })?;

    tracing::debug!("✅ Session resolved for user: {}", user_id);

    Ok(Session {
        user_id,
        access_token: token.access_token.clone(),
    })
}

/// Like [`resolve`], but a missing or unknown session is `Ok(None)`.
pub async fn resolve_optional(state: &AppState, cookies: &Cookies) -> Result<Option<Session>> {
    match resolve(state, cookies).await {
        Ok(session) => Ok(Some(session)),
        Err(AppError::Unauthenticated) => Ok(None),
        Err(e) => Err(e),
    }
}
