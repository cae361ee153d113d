use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, patch, post, put},
    Router,
};
use tower_cookies::CookieManagerLayer;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{config::Config, handlers, middleware_layer, state::AppState};

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("⚠️ Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::COOKIE,
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(86400))
}

/// Builds the application router.
///
/// # Arguments
///
/// * `state` - The application state.
///
/// # Returns
///
/// The router with every public and session-protected route mounted.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/oauth/callback", get(handlers::oauth::callback))
        .route("/api/motd", get(handlers::info::motd))
        .route("/api/welcome", get(handlers::info::welcome))
        .route("/api/version", get(handlers::info::version))
        .route("/api/domains", get(handlers::info::domains))
        .route("/api/user/profile/{user_id}", get(handlers::account::user_profile))
        .route("/api/proxy/image", get(handlers::proxy::image))
        .route("/api/proxy/api", get(handlers::proxy::api))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/me", get(handlers::account::me))
        .route("/api/stats", get(handlers::files::stats))
        .route(
            "/api/files",
            get(handlers::files::list_files).post(handlers::files::upload_file),
        )
        .route(
            "/api/files/{file_id}",
            get(handlers::files::file_info).delete(handlers::files::delete_file),
        )
        .route(
            "/api/folders",
            get(handlers::folders::list_folders).post(handlers::folders::create_folder),
        )
        .route(
            "/api/folders/{folder_id}",
            patch(handlers::folders::update_folder).delete(handlers::folders::delete_folder),
        )
        .route("/api/folders/{folder_id}/add", post(handlers::folders::add_files))
        .route("/api/folders/{folder_id}/remove", post(handlers::folders::remove_files))
        .route(
            "/api/shorts",
            get(handlers::shorts::list_shorts).post(handlers::shorts::create_short),
        )
        .route("/api/shorts/info", get(handlers::shorts::short_info))
        .route(
            "/api/shorts/{short_id}",
            get(handlers::shorts::short_details).delete(handlers::shorts::delete_short),
        )
        .route("/api/email", get(handlers::email::email_info))
        .route("/api/email/aliases", put(handlers::email::create_alias))
        .route(
            "/api/email/aliases/{alias_id}",
            patch(handlers::email::update_alias).delete(handlers::email::delete_alias),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_session,
        ))
        .with_state(state.clone());

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(CookieManagerLayer::new())
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes))
        .layer(cors_layer(&state.config))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        response::Response,
    };
    use base64::{engine::general_purpose, Engine as _};
    use chrono::Utc;
    use tower::ServiceExt;
    use url::Url;
    use wiremock::{
        matchers::{body_string_contains, header as header_is, method, path, query_param},
        Mock, MockServer, ResponseTemplate,
    };
    use zeroize::Zeroizing;

    use super::*;
    use crate::{
        config::TokenStoreBackend,
        models::token::StoredToken,
        repositories::token::{MemoryTokenStore, TokenStore},
        upstream::relay::RelayClient,
    };

    const DASHBOARD: &str = "https://dash.example/files";

    fn test_config(server: &MockServer) -> Config {
        Config {
            server_host: "127.0.0.1".parse().unwrap(),
            server_port: 4616,
            token_store: TokenStoreBackend::Memory,
            redis_url: String::new(),
            nestrip_base_url: Url::parse(&format!("{}/api/", server.uri())).unwrap(),
            primary_host: "nest.rip".to_string(),
            cdn_host: "cdn.nest.rip".to_string(),
            client_id: Some("client".to_string()),
            client_secret: Some(Zeroizing::new("secret".to_string())),
            redirect_uri: Some("https://bff.example/oauth/callback".to_string()),
            resolution_ip: None,
            enable_response_logging: false,
            dashboard_url: DASHBOARD.to_string(),
            cookie_domain: String::new(),
            session_cookie_secret: None,
            cors_allowed_origins: vec!["http://localhost:3000".to_string()],
            max_upload_bytes: 1024 * 1024,
        }
    }

    fn app(config: &Config, store: &MemoryTokenStore) -> Router {
        let tokens: Arc<dyn TokenStore> = Arc::new(store.clone());
        build_router(AppState::with_token_store(config, tokens).unwrap())
    }

    fn access_token_for(sub: &str) -> String {
        let header = general_purpose::URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
        let claims = general_purpose::URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"{}"}}"#, sub));
        format!("{}.{}.sig", header, claims)
    }

    async fn seed(store: &MemoryTokenStore, user_id: &str, access_token: &str) {
        store
            .upsert(&StoredToken {
                user_id: user_id.to_string(),
                access_token: access_token.to_string(),
                refresh_token: None,
                token_type: Some("Bearer".to_string()),
                expires_in: 3600,
                scope: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
    }

    async fn mock_token_endpoint(server: &MockServer, access_token: &str) {
        Mock::given(method("POST"))
            .and(path("/api/oauth/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": access_token,
                "token_type": "Bearer",
                "expires_in": 3600,
                "refresh_token": "refresh",
                "scope": "openid profile"
            })))
            .mount(server)
            .await;
    }

    fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn set_cookie(response: &Response) -> String {
        response
            .headers()
            .get(header::SET_COOKIE)
            .expect("set-cookie header")
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn callback_sets_cookie_and_redirects() {
        let server = MockServer::start().await;
        mock_token_endpoint(&server, &access_token_for("abc123")).await;
        let store = MemoryTokenStore::new();
        let app = app(&test_config(&server), &store);

        let response = app
            .oneshot(get_request("/oauth/callback?code=the-code", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), DASHBOARD);

        let cookie = set_cookie(&response);
        assert!(cookie.starts_with("NestRipUserId=abc123"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Expires="));

        assert_eq!(store.count().await, 1);
        let record = store.find_by_user_id("abc123").await.unwrap().unwrap();
        assert_eq!(record.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(record.scope.as_deref(), Some("openid profile"));
    }

    #[tokio::test]
    async fn repeated_login_keeps_one_record() {
        let server = MockServer::start().await;
        mock_token_endpoint(&server, &access_token_for("abc123")).await;
        let store = MemoryTokenStore::new();
        let app = app(&test_config(&server), &store);

        for _ in 0..2 {
            let response = app
                .clone()
                .oneshot(get_request("/oauth/callback?code=again", None))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::SEE_OTHER);
        }

        assert_eq!(store.count().await, 1);
    }

    #[tokio::test]
    async fn token_without_subject_is_stored_as_unknown() {
        let server = MockServer::start().await;
        mock_token_endpoint(&server, "opaque-token").await;
        let store = MemoryTokenStore::new();
        let app = app(&test_config(&server), &store);

        let response = app
            .oneshot(get_request("/oauth/callback?code=c", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(set_cookie(&response).starts_with("NestRipUserId=unknown"));
        assert!(store.find_by_user_id("unknown").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn callback_without_oauth_settings_is_plain_400() {
        let server = MockServer::start().await;
        let mut config = test_config(&server);
        config.client_secret = None;
        let store = MemoryTokenStore::new();

        let response = app(&config, &store)
            .oneshot(get_request("/oauth/callback?code=c", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert_eq!(body_text(response).await, "Missing OAuth configuration.");
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn callback_upstream_rejection_is_plain_400() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/oauth/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(serde_json::json!({ "message": "invalid_grant" })),
            )
            .mount(&server)
            .await;
        let store = MemoryTokenStore::new();

        let response = app(&test_config(&server), &store)
            .oneshot(get_request("/oauth/callback?code=bad", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let text = body_text(response).await;
        assert!(text.starts_with("OAuth failed: "));
        assert!(text.contains("invalid_grant"));
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn callback_with_empty_access_token_is_rejected() {
        let server = MockServer::start().await;
        mock_token_endpoint(&server, "").await;
        let store = MemoryTokenStore::new();

        let response = app(&test_config(&server), &store)
            .oneshot(get_request("/oauth/callback?code=c", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "Failed to retrieve access token.");
    }

    #[tokio::test]
    async fn callback_with_out_of_range_lifetime_is_plain_400() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": access_token_for("abc123"),
                "token_type": "Bearer",
                "expires_in": 100_000_000_000_000_000_i64
            })))
            .mount(&server)
            .await;
        let store = MemoryTokenStore::new();

        let response = app(&test_config(&server), &store)
            .oneshot(get_request("/oauth/callback?code=c", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert!(body_text(response).await.starts_with("OAuth failed: "));
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn login_then_me_returns_upstream_profile() {
        let server = MockServer::start().await;
        let access_token = access_token_for("abc123");
        mock_token_endpoint(&server, &access_token).await;
        Mock::given(method("GET"))
            .and(path("/api/oauth/userinfo"))
            .and(header_is("authorization", format!("Bearer {}", access_token).as_str()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "sub": "abc123", "name": "Ada" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        let store = MemoryTokenStore::new();
        let app = app(&test_config(&server), &store);

        let login = app
            .clone()
            .oneshot(get_request("/oauth/callback?code=c", None))
            .await
            .unwrap();
        let cookie = set_cookie(&login);
        let pair = cookie.split(';').next().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(get_request("/api/me", Some(&pair)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["name"], "Ada");

        let anonymous = app.oneshot(get_request("/api/me", None)).await.unwrap();
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(anonymous).await["message"], "Unauthorized");
    }

    #[tokio::test]
    async fn unknown_session_never_reaches_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/oauth/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(0)
            .mount(&server)
            .await;
        let store = MemoryTokenStore::new();

        let response = app(&test_config(&server), &store)
            .oneshot(get_request("/api/me", Some("NestRipUserId=ghost")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn shorts_upstream_failure_is_empty_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/shorts/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let store = MemoryTokenStore::new();
        seed(&store, "abc123", "tok").await;
        let app = app(&test_config(&server), &store);

        let response = app
            .clone()
            .oneshot(get_request("/api/shorts", Some("NestRipUserId=abc123")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "[]");

        let anonymous = app.oneshot(get_request("/api/shorts", None)).await.unwrap();
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn upstream_error_status_and_message_are_propagated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/files/info/missing"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(serde_json::json!({ "message": "File not found" })),
            )
            .mount(&server)
            .await;
        let store = MemoryTokenStore::new();
        seed(&store, "abc123", "tok").await;

        let response = app(&test_config(&server), &store)
            .oneshot(get_request("/api/files/missing", Some("NestRipUserId=abc123")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["message"], "File not found");
    }

    #[tokio::test]
    async fn list_files_forwards_defaults_and_search() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/files"))
            .and(query_param("page", "2"))
            .and(query_param("limit", "50"))
            .and(query_param("sortColumn", "created_at"))
            .and(query_param("sortDirection", "desc"))
            .and(query_param("showPastes", "false"))
            .and(query_param("search", "cat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "files": [] })))
            .expect(1)
            .mount(&server)
            .await;
        let store = MemoryTokenStore::new();
        seed(&store, "abc123", "tok").await;

        let response = app(&test_config(&server), &store)
            .oneshot(get_request("/api/files?page=2&search=cat", Some("NestRipUserId=abc123")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["files"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn delete_replies_with_empty_200() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/shorts/s1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;
        let store = MemoryTokenStore::new();
        seed(&store, "abc123", "tok").await;

        let request = Request::builder()
            .method("DELETE")
            .uri("/api/shorts/s1")
            .header(header::COOKIE, "NestRipUserId=abc123")
            .body(Body::empty())
            .unwrap();
        let response = app(&test_config(&server), &store).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "");
    }

    #[tokio::test]
    async fn create_folder_uses_put_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/files/folders"))
            .and(body_string_contains("\"name\":\"Photos\""))
            .and(body_string_contains("\"color\":null"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "f1" })))
            .expect(1)
            .mount(&server)
            .await;
        let store = MemoryTokenStore::new();
        seed(&store, "abc123", "tok").await;

        let request = Request::builder()
            .method("POST")
            .uri("/api/folders")
            .header(header::COOKIE, "NestRipUserId=abc123")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"Photos"}"#))
            .unwrap();
        let response = app(&test_config(&server), &store).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["id"], "f1");
    }

    #[tokio::test]
    async fn invalid_folder_body_is_rejected_before_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/files/folders"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let store = MemoryTokenStore::new();
        seed(&store, "abc123", "tok").await;

        let request = Request::builder()
            .method("POST")
            .uri("/api/folders")
            .header(header::COOKIE, "NestRipUserId=abc123")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":""}"#))
            .unwrap();
        let response = app(&test_config(&server), &store).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["message"].is_string());
    }

    #[tokio::test]
    async fn upload_is_forwarded_as_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/files/upload"))
            .and(body_string_contains("hello upload"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "file1" })))
            .expect(1)
            .mount(&server)
            .await;
        let store = MemoryTokenStore::new();
        seed(&store, "abc123", "tok").await;

        let body = "--XBOUNDARY\r\n\
            Content-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\
            Content-Type: text/plain\r\n\r\n\
            hello upload\r\n\
            --XBOUNDARY--\r\n";
        let request = Request::builder()
            .method("POST")
            .uri("/api/files")
            .header(header::COOKIE, "NestRipUserId=abc123")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body))
            .unwrap();
        let response = app(&test_config(&server), &store).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["id"], "file1");
    }

    #[tokio::test]
    async fn upload_without_file_part_is_bad_request() {
        let server = MockServer::start().await;
        let store = MemoryTokenStore::new();
        seed(&store, "abc123", "tok").await;

        let body = "--XBOUNDARY\r\n\
            Content-Disposition: form-data; name=\"folder\"\r\n\r\n\
            f1\r\n\
            --XBOUNDARY--\r\n";
        let request = Request::builder()
            .method("POST")
            .uri("/api/files")
            .header(header::COOKIE, "NestRipUserId=abc123")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body))
            .unwrap();
        let response = app(&test_config(&server), &store).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "No file provided");
    }

    #[tokio::test]
    async fn profile_works_with_and_without_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/user/profile/u9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "u9" })))
            .expect(2)
            .mount(&server)
            .await;
        let store = MemoryTokenStore::new();
        seed(&store, "abc123", "tok").await;
        let app = app(&test_config(&server), &store);

        let anonymous = app
            .clone()
            .oneshot(get_request("/api/user/profile/u9", None))
            .await
            .unwrap();
        assert_eq!(anonymous.status(), StatusCode::OK);

        let logged_in = app
            .oneshot(get_request("/api/user/profile/u9", Some("NestRipUserId=abc123")))
            .await
            .unwrap();
        assert_eq!(logged_in.status(), StatusCode::OK);
        assert_eq!(body_json(logged_in).await["id"], "u9");
    }

    #[tokio::test]
    async fn public_info_routes_need_no_session() {
        let server = MockServer::start().await;
        for (upstream, body) in [
            ("/api/motd", serde_json::json!({ "motd": "hello" })),
            ("/api/", serde_json::json!({ "message": "Welcome" })),
            ("/api/version", serde_json::json!({ "version": "1.2.3" })),
            ("/api/domains", serde_json::json!(["nest.rip"])),
        ] {
            Mock::given(method("GET"))
                .and(path(upstream))
                .respond_with(ResponseTemplate::new(200).set_body_json(body))
                .expect(1)
                .mount(&server)
                .await;
        }
        let store = MemoryTokenStore::new();
        let app = app(&test_config(&server), &store);

        let motd = app.clone().oneshot(get_request("/api/motd", None)).await.unwrap();
        assert_eq!(body_json(motd).await["motd"], "hello");

        let welcome = app.clone().oneshot(get_request("/api/welcome", None)).await.unwrap();
        assert_eq!(body_json(welcome).await["message"], "Welcome");

        let version = app.clone().oneshot(get_request("/api/version", None)).await.unwrap();
        assert_eq!(body_json(version).await["version"], "1.2.3");

        let domains = app.oneshot(get_request("/api/domains", None)).await.unwrap();
        assert_eq!(body_json(domains).await, serde_json::json!(["nest.rip"]));
    }

    #[tokio::test]
    async fn create_alias_uses_put_with_forward_to() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/email/aliases"))
            .and(body_string_contains("\"forwardTo\":\"me@example.com\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "id": "a1" })))
            .expect(1)
            .mount(&server)
            .await;
        let store = MemoryTokenStore::new();
        seed(&store, "abc123", "tok").await;

        let request = Request::builder()
            .method("PUT")
            .uri("/api/email/aliases")
            .header(header::COOKIE, "NestRipUserId=abc123")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"alias":"hi","forwardTo":"me@example.com"}"#))
            .unwrap();
        let response = app(&test_config(&server), &store).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["id"], "a1");
    }

    #[tokio::test]
    async fn image_proxy_rejections() {
        let server = MockServer::start().await;
        let store = MemoryTokenStore::new();
        let app = app(&test_config(&server), &store);

        let cases = [
            ("/api/proxy/image", "URL parameter is required"),
            ("/api/proxy/image?url=", "URL parameter is required"),
            ("/api/proxy/image?url=http://nest.rip/a.png", "URL must be a valid HTTPS URL"),
            ("/api/proxy/image?url=not%20a%20url", "URL must be a valid HTTPS URL"),
            ("/api/proxy/image?url=https://nest.rip.evil.com/a.png", "Only nest.rip URLs are allowed"),
            ("/api/proxy/image?url=https://nest.rip@evil.com/a.png", "Only nest.rip URLs are allowed"),
        ];

        for (uri, message) in cases {
            let response = app.clone().oneshot(get_request(uri, None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body_json(response).await["message"], message, "{}", uri);
        }
    }

    #[tokio::test]
    async fn relay_parameter_checks() {
        let server = MockServer::start().await;
        let store = MemoryTokenStore::new();
        let app = app(&test_config(&server), &store);

        let missing_path = app.clone().oneshot(get_request("/api/proxy/api", None)).await.unwrap();
        assert_eq!(missing_path.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(missing_path).await["message"], "path parameter is required");

        let anonymous = app
            .clone()
            .oneshot(get_request("/api/proxy/api?path=files", None))
            .await
            .unwrap();
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(anonymous).await["message"],
            "No token provided and user not authenticated"
        );

        // Any cookie value counts, even one with no token record.
        let with_cookie = app
            .oneshot(get_request("/api/proxy/api?path=files", Some("NestRipUserId=ghost")))
            .await
            .unwrap();
        assert_eq!(with_cookie.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(with_cookie).await["message"], "Token parameter is required");
    }

    #[tokio::test]
    async fn relay_forwards_token_and_returns_json() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/files/info"))
            .and(header_is("authorization", "Bearer query-token"))
            .and(header_is("referer", "https://nest.rip/dash/files"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"used":42}"#))
            .expect(1)
            .mount(&server)
            .await;
        let config = test_config(&server);
        let tokens: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
        let mut state = AppState::with_token_store(&config, tokens).unwrap();
        let origin = Url::parse(&format!("{}/", server.uri())).unwrap();
        state.relay = RelayClient::with_origin(&config.primary_host, origin).unwrap();

        let response = build_router(state)
            .oneshot(get_request("/api/proxy/api?path=files/info&token=query-token", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(body_text(response).await, r#"{"used":42}"#);
    }

    #[tokio::test]
    async fn signed_cookies_reject_tampering() {
        let server = MockServer::start().await;
        mock_token_endpoint(&server, &access_token_for("abc123")).await;
        Mock::given(method("GET"))
            .and(path("/api/oauth/userinfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "sub": "abc123" })))
            .mount(&server)
            .await;
        let mut config = test_config(&server);
        config.session_cookie_secret = Some(Zeroizing::new(vec![7u8; 64]));
        let store = MemoryTokenStore::new();
        seed(&store, "abc124", "other-users-token").await;
        let app = app(&config, &store);

        let login = app
            .clone()
            .oneshot(get_request("/oauth/callback?code=c", None))
            .await
            .unwrap();
        let cookie = set_cookie(&login);
        let pair = cookie.split(';').next().unwrap().to_string();
        assert!(pair.ends_with("abc123"));
        assert_ne!(pair, "NestRipUserId=abc123");

        let valid = app.clone().oneshot(get_request("/api/me", Some(&pair))).await.unwrap();
        assert_eq!(valid.status(), StatusCode::OK);

        let tampered = format!("{}4", pair.trim_end_matches('3'));
        let forged = app.clone().oneshot(get_request("/api/me", Some(&tampered))).await.unwrap();
        assert_eq!(forged.status(), StatusCode::UNAUTHORIZED);

        let plain = app
            .oneshot(get_request("/api/me", Some("NestRipUserId=abc123")))
            .await
            .unwrap();
        assert_eq!(plain.status(), StatusCode::UNAUTHORIZED);
    }
}
