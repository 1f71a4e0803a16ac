//! action-dispatch server binary.
//!
//! Loads a TOML configuration, registers the built-in actions and serves
//! the configured routes until SIGINT/SIGTERM.
//!
//! ```text
//! action-dispatch --config dispatch.toml
//! action-dispatch --bind 127.0.0.1:8080
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use action_dispatch::action::builtin::register_builtins;
use action_dispatch::config::{load_config, AppConfig};
use action_dispatch::lifecycle::wait_for_signal;
use action_dispatch::observability::{init_logging, init_metrics};
use action_dispatch::{ActionRegistry, LifecycleController};

#[derive(Parser)]
#[command(name = "action-dispatch")]
#[command(about = "Configuration-driven HTTP action dispatcher", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?cli.config,
        routes = config.express.routes.len(),
        "action-dispatch starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut registry = ActionRegistry::new();
    register_builtins(&mut registry);

    let controller = LifecycleController::new(Arc::new(registry));
    controller.start(&config).await?;

    wait_for_signal().await;
    controller.stop().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
