use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use sonic_rs::JsonValueTrait;

use crate::{
    error::Result,
    models::{session::Session, short::CreateShortRequest},
    response,
    state::AppState,
    validation::requests::validated,
};

/// Lists the user's short links.
///
/// Upstream failures degrade to an empty list so the dashboard can still
/// render. A missing session is still rejected by the auth layer.
#[axum::debug_handler]
pub async fn list_shorts(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Response {
    match state.nestrip.list_shorts(&session.access_token).await {
        Ok(shorts) if !shorts.is_null() => response::json(StatusCode::OK, &shorts),
        Ok(_) => response::json(StatusCode::OK, &sonic_rs::json!([])),
        Err(e) => {
            tracing::warn!("⚠️ Short link listing failed for user {}: {}", session.user_id, e);
            response::json(StatusCode::OK, &sonic_rs::json!([]))
        }
    }
}

/// Returns the user's short link summary.
#[axum::debug_handler]
pub async fn short_info(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response> {
    let info = state.nestrip.short_info(&session.access_token).await?;
    Ok(response::json(StatusCode::OK, &info))
}

/// Returns one short link.
#[axum::debug_handler]
pub async fn short_details(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(short_id): Path<String>,
) -> Result<Response> {
    let details = state
        .nestrip
        .short_details(&session.access_token, &short_id)
        .await?;
    Ok(response::json(StatusCode::OK, &details))
}

/// Creates a short link.
#[axum::debug_handler]
pub async fn create_short(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreateShortRequest>,
) -> Result<Response> {
    let req = validated(req)?;
    let short = state.nestrip.create_short(&session.access_token, &req).await?;
    tracing::info!("🔗 Short link created for user: {}", session.user_id);
    Ok(response::json(StatusCode::OK, &short))
}

/// Deletes a short link.
#[axum::debug_handler]
pub async fn delete_short(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(short_id): Path<String>,
) -> Result<Response> {
    state
        .nestrip
        .delete_short(&session.access_token, &short_id)
        .await?;
    Ok(StatusCode::OK.into_response())
}
