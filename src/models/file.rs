use serde::Deserialize;

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    50
}

fn default_sort_column() -> String {
    "created_at".to_string()
}

fn default_sort_direction() -> String {
    "desc".to_string()
}

/// The query parameters for listing files.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default = "default_sort_column")]
    pub sort_column: String,
    #[serde(default = "default_sort_direction")]
    pub sort_direction: String,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub show_pastes: bool,
}

impl ListFilesQuery {
    /// Upstream query pairs, in the order the upstream documents them.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("limit", self.limit.to_string()),
            ("sortColumn", self.sort_column.clone()),
            ("sortDirection", self.sort_direction.clone()),
            ("showPastes", self.show_pastes.to_string()),
        ];
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        pairs
    }
}

/// A file received from the dashboard, ready to be forwarded.
pub struct UploadedFile {
    pub file_name: String,
    pub data: Vec<u8>,
    pub folder: Option<String>,
}
