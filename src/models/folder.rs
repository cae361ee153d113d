use garde::Validate;
use serde::{Deserialize, Serialize};

/// The request payload for creating a folder.
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateFolderRequest {
    #[serde(default)]
    #[garde(length(min = 1))]
    pub name: String,
    #[garde(skip)]
    pub color: Option<String>,
}

/// The request payload for renaming or recoloring a folder.
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct UpdateFolderRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[garde(length(min = 1))]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub color: Option<String>,
}

/// The request payload for adding files to, or removing files from, a folder.
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct FolderFilesRequest {
    #[serde(default)]
    #[garde(length(min = 1), inner(length(min = 1)))]
    pub files: Vec<String>,
}
