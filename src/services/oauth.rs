use base64::{Engine as _, engine::general_purpose};
use chrono::Utc;
use sonic_rs::JsonValueTrait;

use crate::error::{AppError, Result};
use crate::models::token::StoredToken;
use crate::services::session;
use crate::state::AppState;

/// The shared identity used when the access token carries no readable subject.
pub const UNKNOWN_USER_ID: &str = "unknown";

/// Decodes one base64url segment of a compact claims token.
///
/// Restores the standard alphabet and padding before decoding: a residual
/// length of 2 gets `==`, 3 gets `=`. A residual length of 1 can never be
/// valid base64 and is rejected.
pub fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    let mut standard: String = segment
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    match standard.len() % 4 {
        2 => standard.push_str("=="),
        3 => standard.push('='),
        _ => {}
    }

    general_purpose::STANDARD.decode(standard).ok()
}

fn subject_claim(access_token: &str) -> Option<String> {
    let payload = access_token.split('.').nth(1)?;
    let claims = decode_segment(payload)?;
    let claims: sonic_rs::Value = sonic_rs::from_slice(&claims).ok()?;
    claims.get("sub")?.as_str().map(str::to_owned)
}

/// Extracts the `sub` claim of an access token as the user id.
///
/// Falls back to [`UNKNOWN_USER_ID`] instead of failing when the token is
/// not a readable claims token.
pub fn user_id_from_access_token(access_token: &str) -> String {
    subject_claim(access_token).unwrap_or_else(|| UNKNOWN_USER_ID.to_string())
}

/// Completes the authorization-code grant and persists the resulting token.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `code` - The authorization code from the upstream redirect.
///
/// # Returns
///
/// The stored token record. The caller establishes the session cookie.
/// A lifetime that cannot be turned into an expiry date is rejected
/// before anything is stored.
pub async fn complete_authorization(state: &AppState, code: &str) -> Result<StoredToken> {
    let settings = state
        .config
        .oauth_settings()
        .ok_or_else(|| AppError::Configuration("Missing OAuth configuration.".to_string()))?;

    let grant = state.nestrip.exchange_code(code, &settings).await?;

    let access_token = grant
        .access_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::BadRequest("Failed to retrieve access token.".to_string()))?;

    let user_id = user_id_from_access_token(&access_token);
    if user_id == UNKNOWN_USER_ID {
        tracing::warn!("⚠️ Access token has no readable subject, using shared id '{}'", UNKNOWN_USER_ID);
    }

    let token = StoredToken {
        user_id,
        access_token,
        refresh_token: grant.refresh_token,
        token_type: grant.token_type,
        expires_in: grant.expires_in,
        scope: grant.scope,
        created_at: Utc::now(),
    };

    let expires_at = token
        .expires_at()
        .ok_or_else(|| AppError::Internal(format!("Token lifetime out of range: {}s", token.expires_in)))?;
    session::cookie_expiry(&token)?;

    state.tokens.upsert(&token).await?;
    tracing::info!("✅ Token stored for user: {} (expires {})", token.user_id, expires_at);

    Ok(token)
}
