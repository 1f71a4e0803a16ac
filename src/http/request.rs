//! Request context and request-id handling.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) unless the client supplied one
//! - Echo the request ID on the response
//! - Carry per-request data (method, path, sub-method, params) into actions
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The context owns its params; uploaded temp files live exactly as long as it does

use std::net::SocketAddr;

use axum::http::{HeaderMap, HeaderName, Method};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::http::params::{Param, Params};

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Wrap a router so every request gets an `x-request-id` and the response echoes it.
pub fn with_request_id(router: Router) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
    )
}

/// Read the request ID from headers.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Everything an action sees about the request it handles.
#[derive(Debug)]
pub struct RequestContext {
    pub request_id: String,
    pub method: Method,
    /// Request path as received (including any sub-method segment).
    pub path: String,
    /// Trailing segment matched against the route's sub-methods.
    pub sub_method: Option<String>,
    /// Query, body and file parameters.
    pub params: Params,
    pub headers: HeaderMap,
    pub remote_addr: Option<SocketAddr>,
}

impl RequestContext {
    /// A bare context, mostly useful for calling actions directly.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            request_id: String::new(),
            method,
            path: path.into(),
            sub_method: None,
            params: Params::default(),
            headers: HeaderMap::new(),
            remote_addr: None,
        }
    }

    pub fn param(&self, name: &str) -> Option<&Param> {
        self.params.get(name)
    }

    /// Header value by name, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use tower::ServiceExt;

    #[tokio::test]
    async fn generates_and_echoes_request_id() {
        let app = with_request_id(Router::new().route("/", get(|| async { "ok" })));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let generated = response.headers().get(X_REQUEST_ID).unwrap().to_str().unwrap();
        assert_eq!(generated.len(), 36);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers().get(X_REQUEST_ID).unwrap(), "abc-123");
    }

    #[test]
    fn request_id_falls_back_to_unknown() {
        assert_eq!(request_id(&HeaderMap::new()), "unknown");
    }
}
