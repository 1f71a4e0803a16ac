//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use action_dispatch::config::{parse_config, AppConfig};
use action_dispatch::http::Param;
use action_dispatch::{ActionError, ActionRegistry, LifecycleController, Reply, RequestContext};
use axum::http::StatusCode;
use serde_json::{json, Value};
use tempfile::TempDir;

/// Route table used by the end-to-end tests.
pub const ROUTES: &str = r#"
[[express.routes]]
get = { path = "/get", file = "action/get.js" }

[[express.routes]]
get = { path = "/getMethods", file = "action/getMethods.js", methods = ["test", "other"] }

[[express.routes]]
get = { path = "/getParams", file = "action/params.js" }

[[express.routes]]
post = { path = "/post", file = "action/post.js" }

[[express.routes]]
post = { path = "/postParams", file = "action/params.js" }

[[express.routes]]
post = { path = "/postMultipart", file = "action/multipart.js" }

[[express.routes]]
get = { path = "/xml", file = "action/xml.js" }

[[express.routes]]
get = { path = "/raw", file = "action/raw.js" }

[[express.routes]]
get = { path = "/file", file = "action/file.js" }

[[express.routes]]
delete = { path = "/fail", file = "action/fail.js" }

[[express.routes]]
get = { path = "/panic", file = "action/panic.js" }
"#;

/// Actions backing [`ROUTES`].
pub fn registry() -> ActionRegistry {
    ActionRegistry::new()
        .with("action/get", |_ctx: RequestContext| async {
            Ok::<_, ActionError>(Reply::json(json!({ "foo": "bar" })))
        })
        .with("action/getMethods", |ctx: RequestContext| async move {
            Ok::<_, ActionError>(Reply::json(json!({ "subMethod": ctx.sub_method })))
        })
        .with("action/params", |ctx: RequestContext| async move {
            Ok::<_, ActionError>(Reply::json(ctx.params.to_json()))
        })
        .with("action/post", |_ctx: RequestContext| async {
            Ok::<_, ActionError>(Reply::json(json!({ "created": true })))
        })
        .with("action/multipart", |ctx: RequestContext| async move {
            let file = match ctx.param("myFile") {
                Some(Param::File(file)) => file,
                _ => return Err(ActionError::bad_request("myFile missing")),
            };
            let content = file
                .read()
                .await
                .map_err(|e| ActionError::internal(e.to_string()))?;
            Ok::<_, ActionError>(Reply::json(json!({
                "foo": ctx.params.value("foo"),
                "baz": ctx.params.value("baz"),
                "myFile": {
                    "originalFilename": file.original_filename,
                    "size": file.size_bytes,
                    "content": String::from_utf8_lossy(&content),
                },
            })))
        })
        .with("action/xml", |_ctx: RequestContext| async {
            Ok::<_, ActionError>(Reply::xml(json!({ "status": "ok", "foo": "bar" })))
        })
        .with("action/raw", |_ctx: RequestContext| async {
            Ok::<_, ActionError>(Reply::raw("foo bar baz"))
        })
        .with("action/file", |_ctx: RequestContext| async {
            Ok::<_, ActionError>(Reply::file("foo.txt"))
        })
        .with("action/fail", |_ctx: RequestContext| async {
            Err::<Reply, _>(ActionError::with_status(StatusCode::FORBIDDEN, "not yours"))
        })
        .with("action/panic", |_ctx: RequestContext| async {
            if true {
                panic!("handler bug");
            }
            Ok::<_, ActionError>(Reply::json(Value::Null))
        })
}

/// A running controller bound to an ephemeral port.
pub struct TestServer {
    pub controller: LifecycleController,
    pub addr: SocketAddr,
    pub config: AppConfig,
    _cwd: TempDir,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, path: &str) -> String {
        format!("ws://{}{}", self.addr, path)
    }

    pub async fn stop(&self) {
        self.controller.stop().await;
    }
}

/// Build a config from [`ROUTES`] plus `extra` TOML, bound to 127.0.0.1:0.
pub fn config(extra: &str, cwd: &TempDir) -> AppConfig {
    let mut config = parse_config(&format!("{extra}\n{ROUTES}")).unwrap();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.cwd = cwd.path().to_path_buf();
    config.express.logger = false;
    config
}

/// Start a server with the test routes. `extra` is prepended TOML.
pub async fn start(extra: &str) -> TestServer {
    let cwd = tempfile::tempdir().unwrap();
    std::fs::write(cwd.path().join("foo.txt"), "foo bar baz").unwrap();

    let config = config(extra, &cwd);
    let controller = LifecycleController::new(Arc::new(registry()));
    let addr = controller
        .start(&config)
        .await
        .unwrap()
        .expect("listener should be open");

    TestServer {
        controller,
        addr,
        config,
        _cwd: cwd,
    }
}
