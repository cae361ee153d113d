use axum::{
    extract::State,
    http::StatusCode,
    response::Response,
};

use crate::{error::Result, response, state::AppState};

/// Relays the upstream message of the day.
#[axum::debug_handler]
pub async fn motd(State(state): State<AppState>) -> Result<Response> {
    let motd = state.nestrip.motd().await?;
    Ok(response::json(StatusCode::OK, &motd))
}

/// Relays the upstream API root greeting.
#[axum::debug_handler]
pub async fn welcome(State(state): State<AppState>) -> Result<Response> {
    let welcome = state.nestrip.welcome().await?;
    Ok(response::json(StatusCode::OK, &welcome))
}

/// Relays the upstream build version.
#[axum::debug_handler]
pub async fn version(State(state): State<AppState>) -> Result<Response> {
    let version = state.nestrip.version().await?;
    Ok(response::json(StatusCode::OK, &version))
}

/// Relays the domains usable for uploads.
#[axum::debug_handler]
pub async fn domains(State(state): State<AppState>) -> Result<Response> {
    let domains = state.nestrip.domains().await?;
    Ok(response::json(StatusCode::OK, &domains))
}
