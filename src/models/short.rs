use garde::Validate;
use serde::{Deserialize, Serialize};

/// The request payload for creating a short link.
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateShortRequest {
    #[serde(default)]
    #[garde(length(min = 1))]
    pub url: String,
    /// Custom short code; the upstream picks one when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub custom: Option<String>,
}
