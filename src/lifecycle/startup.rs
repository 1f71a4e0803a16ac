//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the route table from configuration
//! - Compose the enabled subsystems into one router for the shared listener
//!
//! # Design Decisions
//! - Fail fast: unknown actions and route conflicts abort startup
//! - A disabled subsystem contributes nothing to the router
//! - Both subsystems disabled means there is nothing to serve
//! - With HTTP enabled, `OPTIONS` on the messaging path gets the CORS preflight

use std::sync::Arc;

use axum::Router;

use crate::action::ActionResolver;
use crate::config::AppConfig;
use crate::http::middleware::cors_middleware;
use crate::http::HttpServer;
use crate::lifecycle::controller::LifecycleError;
use crate::lifecycle::Shutdown;
use crate::messaging::{self, Hub};
use crate::routing::RouteTable;

/// Router for the shared listener plus handles the controller keeps.
pub(crate) struct App {
    pub router: Router,
    pub hub: Option<Arc<Hub>>,
}

/// Compose the enabled subsystems. Returns `None` when both are disabled.
pub(crate) fn build_app(
    config: &AppConfig,
    resolver: &dyn ActionResolver,
    shutdown: &Shutdown,
) -> Result<Option<App>, LifecycleError> {
    let http = if config.express.enabled {
        let routes = RouteTable::from_config(&config.express.routes, resolver)?;
        Some(HttpServer::new(&config.express, &config.cwd, routes).router())
    } else {
        tracing::info!("HTTP subsystem disabled");
        None
    };

    let messaging = if config.socket_io.enabled {
        let hub = Arc::new(Hub::new(config.socket_io.log_level));
        let router = messaging::router(&config.socket_io.path, hub.clone(), shutdown.subscribe());
        tracing::info!(path = %config.socket_io.path, "Messaging subsystem configured");
        Some((router, hub))
    } else {
        tracing::info!("Messaging subsystem disabled");
        None
    };

    let app = match (http, messaging) {
        (None, None) => return Ok(None),
        (Some(router), None) => App { router, hub: None },
        (None, Some((router, hub))) => App {
            router,
            hub: Some(hub),
        },
        (Some(http), Some((sockets, hub))) => App {
            router: http.merge(sockets.layer(axum::middleware::from_fn(cors_middleware))),
            hub: Some(hub),
        },
    };
    Ok(Some(app))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionRegistry;
    use crate::config::parse_config;
    use crate::routing::RouteError;

    fn config(toml: &str) -> AppConfig {
        parse_config(toml).unwrap()
    }

    #[test]
    fn both_disabled_builds_nothing() {
        let config = config("[express]\nenabled = false\n[socket-io]\nenabled = false");
        let app = build_app(&config, &ActionRegistry::new(), &Shutdown::new()).unwrap();
        assert!(app.is_none());
    }

    #[test]
    fn unknown_action_is_fatal() {
        let config = config(
            r#"
            [[express.routes]]
            get = { path = "/get", file = "action/missing" }
            "#,
        );
        let err = build_app(&config, &ActionRegistry::new(), &Shutdown::new())
            .err()
            .unwrap();
        assert!(matches!(err, LifecycleError::Route(RouteError::UnknownAction(_))));
    }

    #[test]
    fn messaging_only_keeps_hub() {
        let config = config("[express]\nenabled = false");
        let app = build_app(&config, &ActionRegistry::new(), &Shutdown::new())
            .unwrap()
            .unwrap();
        assert!(app.hub.is_some());
    }
}
