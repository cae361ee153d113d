use std::env;
use std::net::IpAddr;
use anyhow::{Context, Result};
use url::Url;
use zeroize::{Zeroize, Zeroizing};

/// Minimum length of the cookie signing secret, in bytes.
const MIN_COOKIE_SECRET_BYTES: usize = 64;

/// Which backend persists token records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenStoreBackend {
    /// One JSON document per user in Redis.
    Redis,
    /// Process-local map, lost on restart. Local development only.
    Memory,
}

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The address the HTTP server binds to.
    pub server_host: IpAddr,
    /// The port the HTTP server binds to.
    pub server_port: u16,
    /// The token store backend.
    pub token_store: TokenStoreBackend,
    /// The URL of the Redis server.
    pub redis_url: String,
    /// Base URL of the upstream API, always ending in `/`.
    pub nestrip_base_url: Url,
    /// The upstream's primary host, e.g. `nest.rip`.
    pub primary_host: String,
    /// The upstream's CDN host, e.g. `cdn.nest.rip`.
    pub cdn_host: String,
    /// OAuth client id registered with the upstream.
    pub client_id: Option<String>,
    /// OAuth client secret registered with the upstream.
    pub client_secret: Option<Zeroizing<String>>,
    /// Redirect URI registered with the upstream.
    pub redirect_uri: Option<String>,
    /// Pins the upstream API host to a fixed address instead of DNS.
    pub resolution_ip: Option<IpAddr>,
    /// Logs every upstream response body when enabled.
    pub enable_response_logging: bool,
    /// Where the browser is sent after a successful login.
    pub dashboard_url: String,
    /// Domain attribute of the session cookie; empty means host-only.
    pub cookie_domain: String,
    /// Secret used to sign the session cookie. Unsigned when absent.
    pub session_cookie_secret: Option<Zeroizing<Vec<u8>>>,
    /// Origins allowed to call the API with credentials.
    pub cors_allowed_origins: Vec<String>,
    /// Maximum inbound request body size, in bytes.
    pub max_upload_bytes: usize,
}

/// The OAuth client settings needed for a code exchange.
pub struct OAuthSettings<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub redirect_uri: &'a str,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        let mut base_url = env::var("NESTRIP_BASE_URL")
            .unwrap_or_else(|_| "https://nest.rip/api/".to_string());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let token_store = match env::var("TOKEN_STORE")
            .unwrap_or_else(|_| "redis".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "redis" => TokenStoreBackend::Redis,
            "memory" => TokenStoreBackend::Memory,
            other => anyhow::bail!("TOKEN_STORE must be 'redis' or 'memory', got '{}'", other),
        };

        let resolution_ip = match non_empty_var("NESTRIP_RESOLUTION_IP") {
            Some(ip) => Some(ip.parse::<IpAddr>().context("NESTRIP_RESOLUTION_IP must be an IP address")?),
            None => None,
        };

        let session_cookie_secret = match non_empty_var("SESSION_COOKIE_SECRET") {
            Some(mut secret_hex) => {
                let secret = hex::decode(&secret_hex)
                    .context("SESSION_COOKIE_SECRET must be valid hexadecimal")?;
                secret_hex.zeroize();
                if secret.len() < MIN_COOKIE_SECRET_BYTES {
                    anyhow::bail!(
                        "SESSION_COOKIE_SECRET must be at least {} bytes (generate with: openssl rand -hex 64)",
                        MIN_COOKIE_SECRET_BYTES
                    );
                }
                Some(Zeroizing::new(secret))
            }
            None => None,
        };

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "127.0.0.1".to_string())
                .parse()
                .context("Invalid SERVER_HOST")?,
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "4616".to_string())
                .parse()
                .context("Invalid SERVER_PORT")?,
            token_store,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            nestrip_base_url: Url::parse(&base_url).context("Invalid NESTRIP_BASE_URL")?,
            primary_host: env::var("NESTRIP_PRIMARY_HOST")
                .unwrap_or_else(|_| "nest.rip".to_string()),
            cdn_host: env::var("NESTRIP_CDN_HOST")
                .unwrap_or_else(|_| "cdn.nest.rip".to_string()),
            client_id: non_empty_var("NESTRIP_CLIENT_ID"),
            client_secret: non_empty_var("NESTRIP_CLIENT_SECRET").map(Zeroizing::new),
            redirect_uri: non_empty_var("NESTRIP_REDIRECT_URI"),
            resolution_ip,
            enable_response_logging: env::var("NESTRIP_ENABLE_RESPONSE_LOGGING")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .context("Invalid NESTRIP_ENABLE_RESPONSE_LOGGING")?,
            dashboard_url: env::var("DASHBOARD_URL").unwrap_or_default(),
            cookie_domain: env::var("COOKIE_DOMAIN").unwrap_or_default(),
            session_cookie_secret,
            cors_allowed_origins,
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|_| (100 * 1024 * 1024).to_string())
                .parse()
                .context("Invalid MAX_UPLOAD_BYTES")?,
        })
    }

    /// Returns the OAuth client settings, or `None` if any of them is missing.
    pub fn oauth_settings(&self) -> Option<OAuthSettings<'_>> {
        Some(OAuthSettings {
            client_id: self.client_id.as_deref().filter(|v| !v.is_empty())?,
            client_secret: self
                .client_secret
                .as_ref()
                .map(|secret| secret.as_str())
                .filter(|v| !v.is_empty())?,
            redirect_uri: self.redirect_uri.as_deref().filter(|v| !v.is_empty())?,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
