//! Request dispatch: resolve, extract, invoke, encode.
//!
//! # Responsibilities
//! - Resolve the request against the route table
//! - Extract parameters into a [`RequestContext`]
//! - Invoke the action and encode its reply
//! - Turn every failure into a well-formed response
//!
//! # Data Flow
//! ```text
//! Request
//!     → RouteTable::resolve     (404 / 405 on miss)
//!     → params::extract         (400 / 413 on bad body)
//!     → Action::call            (action status on error, 500 on panic)
//!     → ResponseEncoder::encode (500 on unreadable file)
//!     → Response
//! ```
//!
//! # Design Decisions
//! - `OPTIONS` never reaches the dispatcher (CORS middleware answers it)
//! - A panicking action produces a 500; the server keeps running
//! - Internal failures are logged with detail but answered generically

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::FutureExt;
use thiserror::Error;

use crate::action::ActionError;
use crate::http::params::{self, ExtractError, ExtractOptions};
use crate::http::request::{request_id, RequestContext};
use crate::http::response::{self, EncodeError, ResponseEncoder};
use crate::observability::metrics;
use crate::routing::{RouteMiss, RouteTable, Verb};

const INTERNAL_ERROR: &str = "Internal Server Error";

/// Shared state for the dispatch handler.
#[derive(Debug, Clone)]
pub struct DispatchState {
    pub routes: Arc<RouteTable>,
    pub encoder: ResponseEncoder,
    pub extract: ExtractOptions,
    /// Emit one info line per request.
    pub access_log: bool,
}

/// Failures while handling a request.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no route for {method} {path}")]
    NotFound { method: String, path: String },

    #[error("{method} not allowed")]
    MethodNotAllowed { method: String, allowed: Vec<Verb> },

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("{0}")]
    Unexpected(String),
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        match self {
            DispatchError::NotFound { method, path } => response::not_found(&method, &path),
            DispatchError::MethodNotAllowed { allowed, .. } => {
                response::method_not_allowed(&allowed)
            }
            DispatchError::Extract(ExtractError::Malformed(message)) => {
                response::error_response(StatusCode::BAD_REQUEST, &message)
            }
            DispatchError::Extract(err @ ExtractError::TooLarge { .. }) => {
                response::error_response(StatusCode::PAYLOAD_TOO_LARGE, &err.to_string())
            }
            DispatchError::Action(err) => response::error_response(err.status(), err.message()),
            DispatchError::Extract(ExtractError::Storage(_))
            | DispatchError::Encode(_)
            | DispatchError::Unexpected(_) => {
                response::error_response(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR)
            }
        }
    }
}

/// Fallback handler serving every registered route.
pub async fn dispatch(State(state): State<DispatchState>, request: Request) -> Response {
    let start = Instant::now();
    let request_id = request_id(request.headers()).to_string();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let mut route = String::from("none");

    let response = match handle(&state, request, &request_id, &mut route).await {
        Ok(response) => response,
        Err(err) => {
            match &err {
                DispatchError::NotFound { .. } | DispatchError::MethodNotAllowed { .. } => {
                    tracing::debug!(request_id = %request_id, error = %err, "Route miss");
                }
                DispatchError::Extract(ExtractError::Malformed(_) | ExtractError::TooLarge { .. })
                | DispatchError::Action(_) => {
                    tracing::warn!(request_id = %request_id, error = %err, "Request failed");
                }
                _ => {
                    tracing::error!(request_id = %request_id, error = %err, "Request failed");
                }
            }
            err.into_response()
        }
    };

    let status = response.status();
    metrics::record_request(method.as_str(), status.as_u16(), &route, start);
    if state.access_log {
        tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Request handled"
        );
    }
    response
}

async fn handle(
    state: &DispatchState,
    request: Request,
    request_id: &str,
    route_label: &mut String,
) -> Result<Response, DispatchError> {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let (action, sub_method) = match state.routes.resolve(&method, &path) {
        Ok(found) => {
            *route_label = found.route.descriptor().path.clone();
            (found.route.action().clone(), found.sub_method)
        }
        Err(RouteMiss::NotFound) => {
            return Err(DispatchError::NotFound {
                method: method.to_string(),
                path,
            })
        }
        Err(RouteMiss::MethodNotAllowed { allowed }) => {
            return Err(DispatchError::MethodNotAllowed {
                method: method.to_string(),
                allowed,
            })
        }
    };

    let headers = request.headers().clone();
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let params = params::extract(request, &state.extract).await?;

    tracing::debug!(
        request_id = %request_id,
        route = %route_label,
        sub_method = ?sub_method,
        params = params.len(),
        "Invoking action"
    );

    let ctx = RequestContext {
        request_id: request_id.to_string(),
        method,
        path,
        sub_method,
        params,
        headers,
        remote_addr,
    };

    let reply = AssertUnwindSafe(async move { action.call(ctx).await })
        .catch_unwind()
        .await
        .map_err(|panic| DispatchError::Unexpected(panic_message(panic.as_ref())))??;

    Ok(state.encoder.encode(reply).await?)
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("action panicked: {detail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Reply;
    use crate::routing::RouteDescriptor;
    use axum::body::Body;
    use axum::http::header;
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn route(verb: Verb, path: &str, sub_methods: &[&str]) -> RouteDescriptor {
        RouteDescriptor {
            verb,
            path: path.to_string(),
            handler: format!("test{path}"),
            sub_methods: (!sub_methods.is_empty())
                .then(|| sub_methods.iter().map(|s| s.to_string()).collect()),
        }
    }

    fn app() -> Router {
        let mut table = RouteTable::new();
        table
            .register(
                route(Verb::Get, "/get", &["test"]),
                Arc::new(|ctx: RequestContext| async move {
                    Ok::<_, ActionError>(Reply::json(json!({
                        "foo": ctx.params.str("foo").unwrap_or("bar"),
                        "sub": ctx.sub_method,
                    })))
                }),
            )
            .unwrap();
        table
            .register(
                route(Verb::Post, "/fail", &[]),
                Arc::new(|_ctx: RequestContext| async {
                    Err::<Reply, _>(ActionError::with_status(StatusCode::CONFLICT, "taken"))
                }),
            )
            .unwrap();
        table
            .register(
                route(Verb::Get, "/panic", &[]),
                Arc::new(|_ctx: RequestContext| async {
                    if true {
                        panic!("boom");
                    }
                    Ok::<_, ActionError>(Reply::json(Value::Null))
                }),
            )
            .unwrap();

        let state = DispatchState {
            routes: Arc::new(table),
            encoder: ResponseEncoder::new("."),
            extract: ExtractOptions::default(),
            access_log: false,
        };
        Router::new().fallback(dispatch).with_state(state)
    }

    async fn send(method: &str, uri: &str, body: Body) -> Response {
        app()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(body)
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn dispatches_to_action() {
        let response = send("GET", "/get?foo=qux", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"foo": "qux", "sub": null}));
    }

    #[tokio::test]
    async fn sub_method_is_passed_through() {
        let response = send("GET", "/get/test", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["sub"], "test");

        let response = send("GET", "/get/other", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn misses_map_to_404_and_405() {
        let response = send("GET", "/", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Cannot GET /\n");

        let response = send("DELETE", "/get", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn action_error_keeps_its_status() {
        let response = send("POST", "/fail", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            json_body(response).await,
            json!({"status": "error", "message": "taken"})
        );
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let response = send("GET", "/get", Body::from("{not json")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn panic_becomes_500() {
        let response = send("GET", "/panic", Body::empty()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await["message"], INTERNAL_ERROR);
    }
}
