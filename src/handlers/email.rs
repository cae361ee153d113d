use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};

use crate::{
    error::Result,
    models::{
        email::{CreateAliasRequest, UpdateAliasRequest},
        session::Session,
    },
    response,
    state::AppState,
    validation::requests::validated,
};

/// Returns the user's mailbox and its aliases.
#[axum::debug_handler]
pub async fn email_info(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response> {
    let info = state.nestrip.email_info(&session.access_token).await?;
    Ok(response::json(StatusCode::OK, &info))
}

/// Creates an email alias.
#[axum::debug_handler]
pub async fn create_alias(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreateAliasRequest>,
) -> Result<Response> {
    let req = validated(req)?;
    let alias = state
        .nestrip
        .create_email_alias(&session.access_token, &req)
        .await?;
    tracing::info!("✅ Email alias created for user: {}", session.user_id);
    Ok(response::json(StatusCode::OK, &alias))
}

/// Updates an email alias.
#[axum::debug_handler]
pub async fn update_alias(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(alias_id): Path<String>,
    Json(req): Json<UpdateAliasRequest>,
) -> Result<Response> {
    let req = validated(req)?;
    let alias = state
        .nestrip
        .update_email_alias(&session.access_token, &alias_id, &req)
        .await?;
    Ok(response::json(StatusCode::OK, &alias))
}

/// Deletes an email alias.
#[axum::debug_handler]
pub async fn delete_alias(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(alias_id): Path<String>,
) -> Result<Response> {
    state
        .nestrip
        .delete_email_alias(&session.access_token, &alias_id)
        .await?;
    tracing::info!("✅ Email alias {} deleted for user: {}", alias_id, session.user_id);
    Ok(StatusCode::OK.into_response())
}
