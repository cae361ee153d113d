use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension,
};

use crate::{
    error::{AppError, Result},
    models::{
        file::{ListFilesQuery, UploadedFile},
        session::Session,
    },
    response,
    state::AppState,
};

const DEFAULT_FILE_NAME: &str = "upload";

/// Returns the user's storage statistics.
#[axum::debug_handler]
pub async fn stats(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<Response> {
    let stats = state.nestrip.file_stats(&session.access_token).await?;
    Ok(response::json(StatusCode::OK, &stats))
}

/// Lists the user's files.
///
/// # Arguments
///
/// * `query` - Paging, sorting and search options; omitted values take the
///   dashboard defaults (page 1, 50 per page, newest first).
#[axum::debug_handler]
pub async fn list_files(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Query(query): Query<ListFilesQuery>,
) -> Result<Response> {
    tracing::debug!(
        "📋 Listing files for user {} (page {}, limit {})",
        session.user_id,
        query.page,
        query.limit
    );

    let files = state.nestrip.list_files(&session.access_token, &query).await?;
    Ok(response::json(StatusCode::OK, &files))
}

/// Returns one file's details.
#[axum::debug_handler]
pub async fn file_info(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(file_id): Path<String>,
) -> Result<Response> {
    let info = state.nestrip.file_info(&session.access_token, &file_id).await?;
    Ok(response::json(StatusCode::OK, &info))
}

/// Reads the dashboard's multipart upload into memory.
///
/// Expects a `file` part and an optional `folder` text part. Unknown parts
/// are ignored.
async fn read_upload(mut multipart: Multipart) -> Result<UploadedFile> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut folder: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "file" => {
                let file_name = field
                    .file_name()
                    .filter(|name| !name.is_empty())
                    .unwrap_or(DEFAULT_FILE_NAME)
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file: {}", e)))?;
                file = Some((file_name, data.to_vec()));
            }
            "folder" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid folder field: {}", e)))?;
                folder = Some(value).filter(|v| !v.is_empty());
            }
            _ => {}
        }
    }

    let (file_name, data) = file.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;

    Ok(UploadedFile {
        file_name,
        data,
        folder,
    })
}

/// Forwards an upload to the upstream.
#[axum::debug_handler]
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    multipart: Multipart,
) -> Result<Response> {
    let upload = read_upload(multipart).await?;

    tracing::info!(
        "📤 Upload from user {}: {} ({} bytes)",
        session.user_id,
        upload.file_name,
        upload.data.len()
    );

    let uploaded = state.nestrip.upload_file(&session.access_token, upload).await?;
    Ok(response::json(StatusCode::OK, &uploaded))
}

/// Deletes a file.
#[axum::debug_handler]
pub async fn delete_file(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(file_id): Path<String>,
) -> Result<Response> {
    state.nestrip.delete_file(&session.access_token, &file_id).await?;
    tracing::info!("🗑️ File {} deleted for user: {}", file_id, session.user_id);
    Ok(StatusCode::OK.into_response())
}
