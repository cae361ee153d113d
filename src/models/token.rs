use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// One user's upstream authorization grant.
///
/// At most one record exists per `user_id`; a new login replaces the old one.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct StoredToken {
    /// Subject claim of the access token, or `"unknown"`.
    pub user_id: String,
    /// Bearer credential attached to upstream calls.
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
    /// Seconds until the access token expires, as reported at issuance.
    pub expires_in: i64,
    pub scope: Option<String>,
    /// System clock at exchange time.
    #[zeroize(skip)]
    pub created_at: DateTime<Utc>,
}

impl StoredToken {
    /// Absolute expiry of the access token.
    ///
    /// `None` when `expires_in` does not fit the calendar range.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        TimeDelta::try_seconds(self.expires_in).and_then(|lifetime| self.created_at.checked_add_signed(lifetime))
    }
}

impl std::fmt::Debug for StoredToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredToken")
            .field("user_id", &self.user_id)
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
