use std::net::SocketAddr;

use axum::{body::Bytes, http::StatusCode};
use reqwest::{multipart, Method, RequestBuilder};
use serde::Serialize;
use sonic_rs::{JsonValueTrait, Value};
use url::Url;

use crate::{
    config::{Config, OAuthSettings},
    error::{AppError, Result},
    models::{
        email::{CreateAliasRequest, UpdateAliasRequest},
        file::{ListFilesQuery, UploadedFile},
        folder::{CreateFolderRequest, FolderFilesRequest, UpdateFolderRequest},
        oauth::OAuthTokenResponse,
        short::CreateShortRequest,
    },
};

/// Client for the nest.rip REST API.
///
/// Holds no per-user state: every call that acts on behalf of a user takes
/// the bearer token as an argument.
#[derive(Clone)]
pub struct NestRipClient {
    http: reqwest::Client,
    base_url: Url,
    log_responses: bool,
}

impl NestRipClient {
    /// Creates a new `NestRipClient`.
    ///
    /// When `resolution_ip` is configured, the API host is pinned to that
    /// address instead of being resolved through DNS.
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder();

        if let (Some(ip), Some(host)) = (config.resolution_ip, config.nestrip_base_url.host_str()) {
            let port = config.nestrip_base_url.port_or_known_default().unwrap_or(443);
            builder = builder.resolve(host, SocketAddr::new(ip, port));
            tracing::info!("📌 Upstream host {} pinned to {}", host, ip);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: config.nestrip_base_url.clone(),
            log_responses: config.enable_response_logging,
        })
    }

    /// Builds an endpoint URL below the API base, percent-encoding every
    /// segment so caller-supplied ids cannot escape their path position.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Internal("Upstream base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url, token: Option<&str>) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Sends a request and returns the body of a successful response.
    async fn execute(&self, label: &str, request: RequestBuilder) -> Result<Bytes> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if self.log_responses {
            tracing::info!("{} response: {} - {}", label, status, String::from_utf8_lossy(&body));
        }

        if !status.is_success() {
            return Err(AppError::Upstream {
                status,
                message: upstream_message(status, &body),
            });
        }

        Ok(body)
    }

    async fn execute_json(&self, label: &str, request: RequestBuilder) -> Result<Value> {
        let body = self.execute(label, request).await?;
        parse_json(&body)
    }

    async fn get(&self, segments: &[&str], token: Option<&str>) -> Result<Value> {
        let url = self.endpoint(segments)?;
        let label = format!("GET {}", url.path());
        self.execute_json(&label, self.request(Method::GET, url, token)).await
    }

    async fn send_json<B: Serialize>(
        &self,
        method: Method,
        segments: &[&str],
        token: &str,
        body: &B,
    ) -> Result<Value> {
        let url = self.endpoint(segments)?;
        let label = format!("{} {}", method, url.path());
        let payload = sonic_rs::to_vec(body)
            .map_err(|e| AppError::Internal(format!("Request serialization failed: {}", e)))?;
        let request = self
            .request(method, url, Some(token))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload);
        self.execute_json(&label, request).await
    }

    async fn delete(&self, segments: &[&str], token: &str) -> Result<()> {
        let url = self.endpoint(segments)?;
        let label = format!("DELETE {}", url.path());
        self.execute(&label, self.request(Method::DELETE, url, Some(token)))
            .await
            .map(|_| ())
    }

    // ── OAuth ───────────────────────────────────────────────────────────

    /// Exchanges an authorization code for a token pair.
    pub async fn exchange_code(&self, code: &str, settings: &OAuthSettings<'_>) -> Result<OAuthTokenResponse> {
        let url = self.endpoint(&["oauth", "token"])?;
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", settings.redirect_uri),
            ("client_id", settings.client_id),
            ("client_secret", settings.client_secret),
        ];
        let body = self
            .execute("POST /oauth/token", self.http.post(url).form(&form))
            .await?;

        sonic_rs::from_slice(&body)
            .map_err(|e| AppError::Internal(format!("Failed to parse token response: {}", e)))
    }

    /// The OpenID userinfo of the token's owner.
    pub async fn user_info(&self, token: &str) -> Result<Value> {
        self.get(&["oauth", "userinfo"], Some(token)).await
    }

    // ── Public ──────────────────────────────────────────────────────────

    pub async fn motd(&self) -> Result<Value> {
        self.get(&["motd"], None).await
    }

    /// The API root greeting.
    pub async fn welcome(&self) -> Result<Value> {
        self.get(&[""], None).await
    }

    pub async fn version(&self) -> Result<Value> {
        self.get(&["version"], None).await
    }

    pub async fn domains(&self) -> Result<Value> {
        self.get(&["domains"], None).await
    }

    /// A user's public profile; a token lets the upstream reveal private fields.
    pub async fn user_profile(&self, user_id: &str, token: Option<&str>) -> Result<Value> {
        self.get(&["user", "profile", user_id], token).await
    }

    // ── Files ───────────────────────────────────────────────────────────

    pub async fn list_files(&self, token: &str, query: &ListFilesQuery) -> Result<Value> {
        let url = self.endpoint(&["files"])?;
        let label = format!("GET {}", url.path());
        let request = self
            .request(Method::GET, url, Some(token))
            .query(&query.to_pairs());
        self.execute_json(&label, request).await
    }

    pub async fn file_stats(&self, token: &str) -> Result<Value> {
        self.get(&["files", "info"], Some(token)).await
    }

    pub async fn file_info(&self, token: &str, file_id: &str) -> Result<Value> {
        self.get(&["files", "info", file_id], Some(token)).await
    }

    /// Forwards an upload as multipart form data.
    pub async fn upload_file(&self, token: &str, file: UploadedFile) -> Result<Value> {
        let url = self.endpoint(&["files", "upload"])?;
        let label = format!("POST {}", url.path());

        let part = multipart::Part::bytes(file.data)
            .file_name(file.file_name)
            .mime_str("application/octet-stream")?;
        let mut form = multipart::Form::new().part("file", part);
        if let Some(folder) = file.folder.filter(|f| !f.is_empty()) {
            form = form.text("folder", folder);
        }

        let request = self.request(Method::POST, url, Some(token)).multipart(form);
        self.execute_json(&label, request).await
    }

    pub async fn delete_file(&self, token: &str, file_id: &str) -> Result<()> {
        self.delete(&["files", file_id], token).await
    }

    // ── Folders ─────────────────────────────────────────────────────────

    pub async fn list_folders(&self, token: &str) -> Result<Value> {
        self.get(&["files", "folders"], Some(token)).await
    }

    pub async fn create_folder(&self, token: &str, req: &CreateFolderRequest) -> Result<Value> {
        self.send_json(Method::PUT, &["files", "folders"], token, req).await
    }

    pub async fn update_folder(&self, token: &str, folder_id: &str, req: &UpdateFolderRequest) -> Result<Value> {
        self.send_json(Method::PATCH, &["files", "folders", folder_id], token, req)
            .await
    }

    pub async fn delete_folder(&self, token: &str, folder_id: &str) -> Result<()> {
        self.delete(&["files", "folders", folder_id], token).await
    }

    pub async fn add_files_to_folder(&self, token: &str, folder_id: &str, req: &FolderFilesRequest) -> Result<Value> {
        self.send_json(Method::POST, &["files", "folders", folder_id, "add"], token, req)
            .await
    }

    pub async fn remove_files_from_folder(
        &self,
        token: &str,
        folder_id: &str,
        req: &FolderFilesRequest,
    ) -> Result<Value> {
        self.send_json(Method::POST, &["files", "folders", folder_id, "remove"], token, req)
            .await
    }

    // ── Shorts ──────────────────────────────────────────────────────────

    pub async fn list_shorts(&self, token: &str) -> Result<Value> {
        self.get(&["shorts", ""], Some(token)).await
    }

    pub async fn short_info(&self, token: &str) -> Result<Value> {
        self.get(&["shorts", "info"], Some(token)).await
    }

    pub async fn short_details(&self, token: &str, short_id: &str) -> Result<Value> {
        self.get(&["shorts", short_id], Some(token)).await
    }

    pub async fn create_short(&self, token: &str, req: &CreateShortRequest) -> Result<Value> {
        self.send_json(Method::PUT, &["shorts"], token, req).await
    }

    pub async fn delete_short(&self, token: &str, short_id: &str) -> Result<()> {
        self.delete(&["shorts", short_id], token).await
    }

    // ── Email ───────────────────────────────────────────────────────────

    pub async fn email_info(&self, token: &str) -> Result<Value> {
        self.get(&["email"], Some(token)).await
    }

    pub async fn create_email_alias(&self, token: &str, req: &CreateAliasRequest) -> Result<Value> {
        self.send_json(Method::PUT, &["email", "aliases"], token, req).await
    }

    pub async fn update_email_alias(&self, token: &str, alias_id: &str, req: &UpdateAliasRequest) -> Result<Value> {
        self.send_json(Method::PATCH, &["email", "aliases", alias_id], token, req)
            .await
    }

    pub async fn delete_email_alias(&self, token: &str, alias_id: &str) -> Result<()> {
        self.delete(&["email", "aliases", alias_id], token).await
    }
}

/// Parses an upstream body; an empty body is JSON `null`.
fn parse_json(body: &[u8]) -> Result<Value> {
    if body.is_empty() {
        return Ok(Value::new());
    }
    sonic_rs::from_slice(body)
        .map_err(|e| AppError::Internal(format!("Failed to parse upstream response: {}", e)))
}

/// The upstream's own `message` field, or a generic description.
fn upstream_message(status: StatusCode, body: &[u8]) -> String {
    sonic_rs::from_slice::<Value>(body)
        .ok()
        .and_then(|json| json.get("message").and_then(|m| m.as_str()).map(str::to_owned))
        .unwrap_or_else(|| format!("Upstream request failed with status {}", status))
}
