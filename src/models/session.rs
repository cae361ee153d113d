/// A resolved session: the caller's user id and the bearer token to use
/// for upstream calls made on their behalf.
///
/// Inserted into request extensions by the session middleware.
#[derive(Clone)]
pub struct Session {
    /// The user id carried by the session cookie.
    pub user_id: String,
    /// The stored upstream access token. No expiry check is applied.
    pub access_token: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("access_token", &"[redacted]")
            .finish()
    }
}
