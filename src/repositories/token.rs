use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, Result},
    models::token::StoredToken,
};

/// Persists one token record per user.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Inserts the record, replacing any existing record for the same user.
    async fn upsert(&self, token: &StoredToken) -> Result<()>;

    /// Finds the record for a user id.
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<StoredToken>>;
}

/// The Redis key holding a user's token record.
fn token_key(user_id: &str) -> String {
    format!("token:{}", user_id)
}

/// Stores each record as a JSON document under `token:<user_id>`.
///
/// Records carry no TTL: they are only ever replaced by a later login.
#[derive(Clone)]
pub struct RedisTokenStore {
    redis: ConnectionManager,
}

impl RedisTokenStore {
    /// Creates a new `RedisTokenStore`.
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

#[async_trait]
impl TokenStore for RedisTokenStore {
    async fn upsert(&self, token: &StoredToken) -> Result<()> {
        let document = sonic_rs::to_string(token)
            .map_err(|e| AppError::Internal(format!("Token serialization failed: {}", e)))?;

        let mut conn = self.redis.clone();
        let _: () = conn
            .set(token_key(&token.user_id), &document)
            .await
            .map_err(|e| {
                tracing::error!("❌ Redis set failed for token of user {}: {}", token.user_id, e);
                AppError::Redis(e)
            })?;

        tracing::debug!("✅ Token record saved: {}", token_key(&token.user_id));
        Ok(())
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<StoredToken>> {
        let mut conn = self.redis.clone();
        let document: Option<String> = conn.get(token_key(user_id)).await?;

        document
            .map(|json| {
                sonic_rs::from_str::<StoredToken>(&json).map_err(|e| {
                    tracing::warn!("❌ Invalid token JSON for user {}: {}", user_id, e);
                    AppError::Internal(format!("Corrupt token record: {}", e))
                })
            })
            .transpose()
    }
}

/// A process-local token store, used for local development and tests.
#[derive(Clone, Default)]
pub struct MemoryTokenStore {
    tokens: Arc<RwLock<HashMap<String, StoredToken>>>,
}

impl MemoryTokenStore {
    /// Creates a new, empty `MemoryTokenStore`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored records.
    #[cfg(test)]
    pub async fn count(&self) -> usize {
        self.tokens.read().await.len()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn upsert(&self, token: &StoredToken) -> Result<()> {
        self.tokens
            .write()
            .await
            .insert(token.user_id.clone(), token.clone());
        Ok(())
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<StoredToken>> {
        Ok(self.tokens.read().await.get(user_id).cloned())
    }
}
