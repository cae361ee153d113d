use std::sync::Arc;

use redis::aio::ConnectionManager;
use tower_cookies::Key;

use crate::{
    config::{Config, TokenStoreBackend},
    error::{AppError, Result},
    repositories::token::{MemoryTokenStore, RedisTokenStore, TokenStore},
    upstream::{client::NestRipClient, relay::RelayClient},
};

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Arc<Config>,
    /// Where token records live.
    pub tokens: Arc<dyn TokenStore>,
    /// The upstream API client.
    pub nestrip: NestRipClient,
    /// The permissive client behind the image and raw API proxies.
    pub relay: RelayClient,
    /// Signs the session cookie when configured.
    pub cookie_key: Option<Key>,
}

impl AppState {
    /// Creates a new `AppState`, connecting to the configured token store.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        let tokens: Arc<dyn TokenStore> = match config.token_store {
            TokenStoreBackend::Redis => {
                let redis_client = redis::Client::open(config.redis_url.as_str())?;
                let redis = ConnectionManager::new(redis_client).await?;
                tracing::info!("✅ Redis Connection Manager initialized (token store)");
                Arc::new(RedisTokenStore::new(redis))
            }
            TokenStoreBackend::Memory => {
                tracing::warn!("⚠️ Using in-memory token store, sessions are lost on restart");
                Arc::new(MemoryTokenStore::new())
            }
        };

        Self::with_token_store(config, tokens)
    }

    /// Creates a new `AppState` around an existing token store.
    pub fn with_token_store(config: &Config, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        let nestrip = NestRipClient::new(config)?;
        tracing::info!("✅ Upstream client initialized: {}", config.nestrip_base_url);

        let relay = RelayClient::new(&config.primary_host)?;
        tracing::info!("✅ Relay client initialized for {} / {}", config.primary_host, config.cdn_host);

        let cookie_key = match config.session_cookie_secret.as_ref() {
            Some(secret) => {
                let key = Key::try_from(secret.as_slice())
                    .map_err(|e| AppError::Configuration(format!("Invalid session cookie secret: {}", e)))?;
                tracing::info!("✅ Session cookies are signed");
                Some(key)
            }
            None => {
                tracing::warn!("⚠️ SESSION_COOKIE_SECRET not set, session cookies are unsigned");
                None
            }
        };

        Ok(AppState {
            config: Arc::new(config.clone()),
            tokens,
            nestrip,
            relay,
            cookie_key,
        })
    }
}
