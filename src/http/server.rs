//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router serving every configured route
//! - Wire up middleware (request ID, tracing, CORS, limits, timeout)
//!
//! # Design Decisions
//! - All routes go through one fallback handler backed by the route table
//! - The body limit is applied once for every body type
//! - Request ID is the outermost layer so every log line can carry it

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ExpressConfig;
use crate::http::dispatcher::{dispatch, DispatchState};
use crate::http::middleware::cors_middleware;
use crate::http::params::ExtractOptions;
use crate::http::request::with_request_id;
use crate::http::response::ResponseEncoder;
use crate::routing::RouteTable;

/// The HTTP action-dispatch subsystem.
#[derive(Debug)]
pub struct HttpServer {
    state: DispatchState,
    request_timeout: Option<Duration>,
    trace: bool,
}

impl HttpServer {
    /// `cwd` anchors relative file replies.
    pub fn new(config: &ExpressConfig, cwd: &Path, routes: RouteTable) -> Self {
        tracing::info!(
            routes = routes.len(),
            max_body_size = config.max_body_size,
            "HTTP subsystem configured"
        );

        Self {
            state: DispatchState {
                routes: Arc::new(routes),
                encoder: ResponseEncoder::new(cwd),
                extract: ExtractOptions {
                    max_body_size: config.max_body_size,
                    upload_dir: config.upload_dir.clone(),
                },
                access_log: config.logger,
            },
            request_timeout: config.request_timeout_secs.map(Duration::from_secs),
            trace: config.logger,
        }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.state.routes
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(&self) -> Router {
        let mut router = Router::new()
            .fallback(dispatch)
            .with_state(self.state.clone())
            .layer(DefaultBodyLimit::max(self.state.extract.max_body_size))
            .layer(axum::middleware::from_fn(cors_middleware));

        if let Some(timeout) = self.request_timeout {
            router = router.layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                timeout,
            ));
        }
        if self.trace {
            router = router.layer(TraceLayer::new_for_http());
        }
        with_request_id(router)
    }
}
