//! Action (handler) subsystem.
//!
//! # Data Flow
//! ```text
//! Route configuration names a handler identifier ("action/get.js")
//!     → registry.rs (ActionResolver normalizes + looks up)
//!     → Arc<dyn Action> stored in the route table
//!
//! Per request:
//!     RequestContext → Action::call → Result<Reply, ActionError>
//!     → reply.rs types consumed by the response encoder
//! ```
//!
//! # Design Decisions
//! - Actions are plain async functions; no module loading at runtime
//! - Resolution happens once at startup through an injected resolver
//! - Synchronous actions run on the blocking pool via [`blocking`]

pub mod builtin;
pub mod registry;
pub mod reply;

use std::future::Future;

use futures_util::future::BoxFuture;

use crate::http::RequestContext;

pub use registry::{normalize_identifier, ActionRegistry, ActionResolver};
pub use reply::{ActionError, Reply};

/// Result produced by an action.
pub type ActionResult = Result<Reply, ActionError>;

/// A request handler bound to one or more routes.
pub trait Action: Send + Sync + 'static {
    /// Handle a request.
    fn call(&self, ctx: RequestContext) -> BoxFuture<'static, ActionResult>;
}

impl<F, Fut> Action for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ActionResult> + Send + 'static,
{
    fn call(&self, ctx: RequestContext) -> BoxFuture<'static, ActionResult> {
        Box::pin(self(ctx))
    }
}

/// Wrap a synchronous handler so it runs on the blocking thread pool.
///
/// Use for handlers doing blocking I/O. A panic inside `f` is re-raised on
/// the dispatching task, where it is reported as an unexpected failure.
pub fn blocking<F>(f: F) -> impl Action
where
    F: Fn(RequestContext) -> ActionResult + Clone + Send + Sync + 'static,
{
    move |ctx: RequestContext| {
        let f = f.clone();
        async move {
            match tokio::task::spawn_blocking(move || f(ctx)).await {
                Ok(result) => result,
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(err) => Err(ActionError::internal(err.to_string())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use serde_json::json;

    #[tokio::test]
    async fn closures_are_actions() {
        let action = |ctx: RequestContext| async move {
            Ok::<_, ActionError>(Reply::json(json!({ "path": ctx.path })))
        };
        let reply = Action::call(&action, RequestContext::new(Method::GET, "/x")).await.unwrap();
        assert_eq!(reply, Reply::json(json!({ "path": "/x" })));
    }

    #[tokio::test]
    async fn blocking_actions_run_off_the_runtime() {
        let action = blocking(|ctx: RequestContext| {
            std::thread::sleep(std::time::Duration::from_millis(5));
            Ok(Reply::raw(ctx.method.to_string()))
        });
        let reply = Action::call(&action, RequestContext::new(Method::POST, "/")).await.unwrap();
        assert_eq!(reply, Reply::raw("POST"));
    }

    #[tokio::test]
    async fn blocking_errors_pass_through() {
        let action = blocking(|_ctx: RequestContext| Err(ActionError::bad_request("nope")));
        let err = Action::call(&action, RequestContext::new(Method::GET, "/")).await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }
}
