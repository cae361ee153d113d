use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

const INTERNAL_ERROR_BODY: &str = r#"{"message":"Internal server error"}"#;

/// Serializes `body` with sonic-rs into an `application/json` response.
pub fn json<T: Serialize>(status: StatusCode, body: &T) -> Response {
    match sonic_rs::to_vec(body) {
        Ok(bytes) => (status, [(header::CONTENT_TYPE, "application/json")], bytes).into_response(),
        Err(e) => {
            tracing::error!("Response serialization failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "application/json")],
                INTERNAL_ERROR_BODY,
            )
                .into_response()
        }
    }
}

/// A `{"message": ...}` response.
pub fn message(status: StatusCode, message: &str) -> Response {
    json(status, &sonic_rs::json!({ "message": message }))
}
