use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_cookies::Cookies;

use crate::{
    error::{AppError, Result},
    response,
    services::session,
    state::AppState,
    validation::proxy::validate_image_url,
};

#[derive(Deserialize, Debug)]
pub struct ImageQuery {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ApiRelayQuery {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

/// Streams an image from an allow-listed upstream host.
///
/// Upstream failures are reported with the upstream status and no body.
#[axum::debug_handler]
pub async fn image(
    State(state): State<AppState>,
    Query(query): Query<ImageQuery>,
) -> Result<Response> {
    let allowed_hosts = [
        state.config.primary_host.as_str(),
        state.config.cdn_host.as_str(),
    ];
    let url = validate_image_url(query.url.as_deref(), &allowed_hosts)?;

    let upstream = state.relay.fetch_image(url).await?;
    Ok(image_response(upstream))
}

/// The media type of an upstream `Content-Type`, without parameters.
fn media_type(upstream: &reqwest::Response) -> HeaderValue {
    upstream
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| HeaderValue::from_str(value).ok())
        .unwrap_or_else(|| HeaderValue::from_static("application/octet-stream"))
}

/// Turns an upstream image response into ours.
///
/// Failures keep the upstream status and drop the body. Successes stream
/// the body through.
fn image_response(upstream: reqwest::Response) -> Response {
    let status = upstream.status();
    if !status.is_success() {
        tracing::warn!("⚠️ Image upstream returned {}", status);
        return status.into_response();
    }

    let content_type = media_type(&upstream);
    (
        [(header::CONTENT_TYPE, content_type)],
        Body::from_stream(upstream.bytes_stream()),
    )
        .into_response()
}

/// Relays a GET to an arbitrary upstream API path with a caller-supplied token.
///
/// ⚠️ The token comes from the query string, not from the session. A
/// session cookie alone is never turned into a token here.
#[axum::debug_handler]
pub async fn api(
    State(state): State<AppState>,
    cookies: Cookies,
    Query(query): Query<ApiRelayQuery>,
) -> Result<Response> {
    let path = query
        .path
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::BadRequest("path parameter is required".to_string()))?;

    let Some(token) = query.token.filter(|t| !t.is_empty()) else {
        if !session::has_session_cookie(&cookies) {
            return Ok(response::message(
                StatusCode::UNAUTHORIZED,
                "No token provided and user not authenticated",
            ));
        }
        return Err(AppError::BadRequest("Token parameter is required".to_string()));
    };

    let upstream = state.relay.fetch_api(&path, &token).await?;
    api_response(&path, upstream).await
}

/// Turns a relayed upstream response into ours: the body as JSON on
/// success, the bare status otherwise.
async fn api_response(path: &str, upstream: reqwest::Response) -> Result<Response> {
    let status = upstream.status();
    if !status.is_success() {
        tracing::warn!("⚠️ Relayed call to {} returned {}", path, status);
        return Ok(status.into_response());
    }

    let body = upstream.text().await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use wiremock::{
        matchers::{method, path},
        Mock, MockServer, ResponseTemplate,
    };

    async fn upstream(server: &MockServer, template: ResponseTemplate) -> reqwest::Response {
        Mock::given(method("GET"))
            .and(path("/resource"))
            .respond_with(template)
            .mount(server)
            .await;
        reqwest::get(format!("{}/resource", server.uri())).await.unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    #[tokio::test]
    async fn image_keeps_media_type_and_body() {
        let server = MockServer::start().await;
        let template = ResponseTemplate::new(200)
            .set_body_raw(b"<svg/>".to_vec(), "image/svg+xml; charset=utf-8");

        let response = image_response(upstream(&server, template).await);

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/svg+xml");
        assert_eq!(body_bytes(response).await, b"<svg/>");
    }

    #[tokio::test]
    async fn image_without_content_type_is_octet_stream() {
        let server = MockServer::start().await;
        let template = ResponseTemplate::new(200).set_body_bytes(vec![0u8, 1, 2]);

        let response = image_response(upstream(&server, template).await);

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/octet-stream");
        assert_eq!(body_bytes(response).await, vec![0u8, 1, 2]);
    }

    #[tokio::test]
    async fn image_failure_keeps_status_without_body() {
        let server = MockServer::start().await;
        let template = ResponseTemplate::new(404).set_body_string("missing");

        let response = image_response(upstream(&server, template).await);

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn relayed_success_is_json() {
        let server = MockServer::start().await;
        let template = ResponseTemplate::new(200).set_body_string(r#"{"files":[]}"#);

        let response = api_response("files", upstream(&server, template).await).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(body_bytes(response).await, br#"{"files":[]}"#);
    }

    #[tokio::test]
    async fn relayed_failure_keeps_status_without_body() {
        let server = MockServer::start().await;
        let template = ResponseTemplate::new(403).set_body_string(r#"{"message":"nope"}"#);

        let response = api_response("files", upstream(&server, template).await).await.unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(body_bytes(response).await.is_empty());
    }
}
