use url::Url;

use crate::error::{AppError, Result};

/// Checks an image URL against the upstream allow-list.
///
/// Only `https` URLs whose host is exactly one of `allowed_hosts` pass.
/// Hosts are compared after URL parsing, so IDNA lookalikes, suffix tricks
/// like `nest.rip.evil.com` and userinfo tricks like `nest.rip@evil.com`
/// are all rejected. Explicit non-default ports are rejected too.
///
/// # Arguments
///
/// * `raw` - The `url` query parameter, if any.
/// * `allowed_hosts` - The upstream's primary and CDN hosts.
///
/// # Returns
///
/// The parsed URL, or `AppError::BadRequest`.
pub fn validate_image_url(raw: Option<&str>, allowed_hosts: &[&str]) -> Result<Url> {
    let raw = raw
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| AppError::BadRequest("URL parameter is required".to_string()))?;

    let url = Url::parse(raw)
        .ok()
        .filter(|url| url.scheme() == "https")
        .ok_or_else(|| AppError::BadRequest("URL must be a valid HTTPS URL".to_string()))?;

    let host_allowed = url
        .host_str()
        .is_some_and(|host| allowed_hosts.iter().any(|allowed| host.eq_ignore_ascii_case(allowed)));

    if !host_allowed || url.port().is_some() || !url.username().is_empty() || url.password().is_some() {
        return Err(AppError::BadRequest("Only nest.rip URLs are allowed".to_string()));
    }

    Ok(url)
}
