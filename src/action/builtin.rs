//! Actions shipped with the binary.

use serde_json::json;

use crate::action::{ActionError, ActionRegistry, Reply};
use crate::http::RequestContext;

/// Reflects the request back as JSON.
pub async fn echo(ctx: RequestContext) -> Result<Reply, ActionError> {
    Ok(Reply::json(json!({
        "method": ctx.method.as_str(),
        "path": ctx.path,
        "subMethod": ctx.sub_method,
        "params": ctx.params.to_json(),
    })))
}

/// Liveness probe.
pub async fn status(_ctx: RequestContext) -> Result<Reply, ActionError> {
    Ok(Reply::json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    })))
}

/// Register the built-in actions under `builtin/*`.
pub fn register_builtins(registry: &mut ActionRegistry) {
    registry
        .register("builtin/echo", echo)
        .register("builtin/status", status);
}
