use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};

use crate::{
    error::Result,
    models::{
        folder::{CreateFolderRequest, FolderFilesRequest, UpdateFolderRequest},
        session::Session,
    },
    response,
    state::AppState,
    validation::requests::validated,
};

/// Lists the user's folders.
#[axum::debug_handler]
pub async fn list_folders(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response> {
    let folders = state.nestrip.list_folders(&session.access_token).await?;
    Ok(response::json(StatusCode::OK, &folders))
}

/// Creates a folder.
///
/// # Arguments
///
/// * `req` - The folder name (non-empty) and an optional color.
#[axum::debug_handler]
pub async fn create_folder(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreateFolderRequest>,
) -> Result<Response> {
    let req = validated(req)?;
    tracing::info!("📁 Creating folder '{}' for user: {}", req.name, session.user_id);

    let folder = state.nestrip.create_folder(&session.access_token, &req).await?;
    Ok(response::json(StatusCode::OK, &folder))
}

/// Renames or recolors a folder.
#[axum::debug_handler]
pub async fn update_folder(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(folder_id): Path<String>,
    Json(req): Json<UpdateFolderRequest>,
) -> Result<Response> {
    let req = validated(req)?;
    let folder = state
        .nestrip
        .update_folder(&session.access_token, &folder_id, &req)
        .await?;
    Ok(response::json(StatusCode::OK, &folder))
}

/// Deletes a folder.
#[axum::debug_handler]
pub async fn delete_folder(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(folder_id): Path<String>,
) -> Result<Response> {
    state
        .nestrip
        .delete_folder(&session.access_token, &folder_id)
        .await?;
    tracing::info!("🗑️ Folder {} deleted for user: {}", folder_id, session.user_id);
    Ok(StatusCode::OK.into_response())
}

/// Adds files to a folder.
#[axum::debug_handler]
pub async fn add_files(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(folder_id): Path<String>,
    Json(req): Json<FolderFilesRequest>,
) -> Result<Response> {
    let req = validated(req)?;
    let result = state
        .nestrip
        .add_files_to_folder(&session.access_token, &folder_id, &req)
        .await?;
    Ok(response::json(StatusCode::OK, &result))
}

/// Removes files from a folder.
#[axum::debug_handler]
pub async fn remove_files(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(folder_id): Path<String>,
    Json(req): Json<FolderFilesRequest>,
) -> Result<Response> {
    let req = validated(req)?;
    let result = state
        .nestrip
        .remove_files_from_folder(&session.access_token, &folder_id, &req)
        .await?;
    Ok(response::json(StatusCode::OK, &result))
}
