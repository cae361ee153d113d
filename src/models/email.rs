use garde::Validate;
use serde::{Deserialize, Serialize};

/// The request payload for creating an email alias.
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct CreateAliasRequest {
    #[serde(default)]
    #[garde(length(min = 1))]
    pub alias: String,
    #[serde(default, rename = "forwardTo")]
    #[garde(length(min = 1))]
    pub forward_to: String,
}

/// The request payload for updating an email alias.
#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct UpdateAliasRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[garde(length(min = 1))]
    pub alias: Option<String>,
    #[serde(rename = "forwardTo", skip_serializing_if = "Option::is_none")]
    #[garde(length(min = 1))]
    pub forward_to: Option<String>,
}
