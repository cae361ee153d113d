use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use url::Url;

use crate::error::{AppError, Result};

const IMAGE_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:146.0) Gecko/20100101 Firefox/146.0";

/// Client for the image proxy and the raw API relay.
///
/// ⚠️ Accepts any TLS certificate. Only ever points at allow-listed
/// upstream hosts.
#[derive(Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    primary_host: String,
    /// Where raw API calls go: `https://<primary host>/`.
    api_origin: Url,
}

impl RelayClient {
    /// Creates a new `RelayClient` for the given upstream host.
    pub fn new(primary_host: &str) -> Result<Self> {
        let api_origin = Url::parse(&format!("https://{}/", primary_host))
            .map_err(|e| AppError::Configuration(format!("Invalid primary host '{}': {}", primary_host, e)))?;
        Self::with_origin(primary_host, api_origin)
    }

    /// Creates a `RelayClient` whose raw API calls go to `api_origin`.
    ///
    /// Browser-like headers still name `primary_host`.
    pub fn with_origin(primary_host: &str, api_origin: Url) -> Result<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()?;

        Ok(Self {
            http,
            primary_host: primary_host.to_string(),
            api_origin,
        })
    }

    /// Fetches an already allow-listed image URL with upstream-like headers.
    pub async fn fetch_image(&self, url: Url) -> Result<reqwest::Response> {
        tracing::debug!("🖼️ Proxying image: {}", url);
        let response = self
            .http
            .get(url)
            .header(USER_AGENT, IMAGE_USER_AGENT)
            .header(REFERER, format!("https://{}/", self.primary_host))
            .send()
            .await?;
        Ok(response)
    }

    /// The upstream URL the raw relay forwards `path` to.
    ///
    /// Fails when `path` would move the request off the primary host.
    pub fn api_url(&self, path: &str) -> Result<Url> {
        let url = Url::parse(&format!("{}api/{}", self.api_origin, path))
            .map_err(|_| AppError::BadRequest("Invalid path parameter".to_string()))?;

        if url.host_str() != self.api_origin.host_str() || url.port() != self.api_origin.port() {
            return Err(AppError::BadRequest("Invalid path parameter".to_string()));
        }
        Ok(url)
    }

    /// Relays a GET to the upstream API with a browser-like header set.
    pub async fn fetch_api(&self, path: &str, token: &str) -> Result<reqwest::Response> {
        let url = self.api_url(path)?;
        tracing::debug!("🔁 Relaying upstream API call: {}", url.path());

        let response = self
            .http
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .header(ACCEPT, "application/json, text/plain, */*")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .bearer_auth(token)
            .header(REFERER, format!("https://{}/dash/files", self.primary_host))
            .header("Sec-Fetch-Dest", "empty")
            .header("Sec-Fetch-Mode", "cors")
            .header("Sec-Fetch-Site", "same-origin")
            .send()
            .await?;
        Ok(response)
    }
}
