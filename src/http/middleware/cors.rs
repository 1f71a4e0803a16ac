//! Permissive CORS handling.
//!
//! # Responsibilities
//! - Answer every `OPTIONS` request before route resolution
//! - Attach the same CORS header set to every other response
//!
//! # Design Decisions
//! - Fixed header values; there is no per-route CORS configuration
//! - Preflight responses are 200 with an empty body

use axum::body::Body;
use axum::extract::Request;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET,PUT,POST,DELETE,OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization, Content-Length, X-Requested-With";

/// Insert the CORS header set, replacing existing values.
pub fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
}

/// Response to any `OPTIONS` request.
pub fn preflight_response() -> Response {
    let mut response = (StatusCode::OK, Body::empty()).into_response();
    apply_cors_headers(response.headers_mut());
    response
}

/// Middleware: short-circuit `OPTIONS`, decorate everything else.
pub async fn cors_middleware(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        tracing::debug!(path = %request.uri().path(), "Preflight answered");
        return preflight_response();
    }

    let mut response = next.run(request).await;
    apply_cors_headers(response.headers_mut());
    response
}
