//! Start/stop state machine for the HTTP and messaging subsystems.
//!
//! # Responsibilities
//! - Track `Stopped → Starting → Running → Stopping → Stopped` per subsystem
//! - Open the shared listener once and serve every enabled subsystem on it
//! - Signal readiness and termination to the host
//!
//! # Design Decisions
//! - `start` resolves once the listener accepts connections
//! - `stop` resolves once the listener is closed and in-flight requests drained
//! - Both are idempotent; the internal lock serializes concurrent calls
//! - Startup failures leave every subsystem `Stopped`

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use crate::action::ActionResolver;
use crate::config::validation::validate_config;
use crate::config::{AppConfig, ConfigError};
use crate::lifecycle::startup::build_app;
use crate::lifecycle::Shutdown;
use crate::messaging::Hub;
use crate::net::{ListenerError, SharedListener};
use crate::routing::RouteError;

/// Errors that abort `start`.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Listener(#[from] ListenerError),
}

/// State of one subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubsystemState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsystem {
    Http,
    Messaging,
}

/// Notifications for the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Accepting connections. `None` when no subsystem is enabled.
    Ready { local_addr: Option<SocketAddr> },
    /// Listener closed; nothing is served anymore.
    Dead,
}

struct RunningServer {
    local_addr: Option<SocketAddr>,
    shutdown: Shutdown,
    task: Option<JoinHandle<()>>,
    hub: Option<Arc<Hub>>,
}

struct Inner {
    http: SubsystemState,
    messaging: SubsystemState,
    running: Option<RunningServer>,
}

impl Inner {
    fn set(&mut self, subsystem: Subsystem, state: SubsystemState) {
        match subsystem {
            Subsystem::Http => self.http = state,
            Subsystem::Messaging => self.messaging = state,
        }
    }

    /// Move every subsystem currently in `from` to `to`.
    fn transition(&mut self, from: SubsystemState, to: SubsystemState) {
        for subsystem in [Subsystem::Http, Subsystem::Messaging] {
            if self.get(subsystem) == from {
                self.set(subsystem, to);
            }
        }
    }

    fn get(&self, subsystem: Subsystem) -> SubsystemState {
        match subsystem {
            Subsystem::Http => self.http,
            Subsystem::Messaging => self.messaging,
        }
    }
}

/// Owns the listener and the subsystems attached to it.
pub struct LifecycleController {
    resolver: Arc<dyn ActionResolver>,
    inner: Mutex<Inner>,
    events: broadcast::Sender<LifecycleEvent>,
}

impl LifecycleController {
    pub fn new(resolver: Arc<dyn ActionResolver>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            resolver,
            inner: Mutex::new(Inner {
                http: SubsystemState::Stopped,
                messaging: SubsystemState::Stopped,
                running: None,
            }),
            events,
        }
    }

    /// Subscribe to readiness/termination events.
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self, subsystem: Subsystem) -> SubsystemState {
        self.inner.lock().await.get(subsystem)
    }

    /// Bound address while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.inner
            .lock()
            .await
            .running
            .as_ref()
            .and_then(|running| running.local_addr)
    }

    pub async fn is_running(&self) -> bool {
        self.inner.lock().await.running.is_some()
    }

    /// Number of connected sockets (0 when messaging is off).
    pub async fn connections(&self) -> usize {
        self.inner
            .lock()
            .await
            .running
            .as_ref()
            .and_then(|running| running.hub.as_ref())
            .map_or(0, |hub| hub.len())
    }

    /// Start the enabled subsystems on the shared listener.
    ///
    /// Returns the bound address, or `None` when both subsystems are
    /// disabled. Calling `start` while running returns the current address.
    pub async fn start(&self, config: &AppConfig) -> Result<Option<SocketAddr>, LifecycleError> {
        let mut inner = self.inner.lock().await;
        if let Some(running) = &inner.running {
            tracing::debug!("Start requested while already running");
            return Ok(running.local_addr);
        }

        if config.express.enabled {
            inner.set(Subsystem::Http, SubsystemState::Starting);
        }
        if config.socket_io.enabled {
            inner.set(Subsystem::Messaging, SubsystemState::Starting);
        }

        match self.launch(config).await {
            Ok(running) => {
                let local_addr = running.local_addr;
                inner.running = Some(running);
                inner.transition(SubsystemState::Starting, SubsystemState::Running);
                tracing::info!(
                    address = ?local_addr,
                    http = config.express.enabled,
                    messaging = config.socket_io.enabled,
                    "Ready"
                );
                let _ = self.events.send(LifecycleEvent::Ready { local_addr });
                Ok(local_addr)
            }
            Err(e) => {
                inner.transition(SubsystemState::Starting, SubsystemState::Stopped);
                tracing::error!(error = %e, "Startup failed");
                Err(e)
            }
        }
    }

    async fn launch(&self, config: &AppConfig) -> Result<RunningServer, LifecycleError> {
        validate_config(config).map_err(ConfigError::Validation)?;

        let shutdown = Shutdown::new();
        let Some(app) = build_app(config, self.resolver.as_ref(), &shutdown)? else {
            tracing::warn!("No subsystem enabled; listener not opened");
            return Ok(RunningServer {
                local_addr: None,
                shutdown,
                task: None,
                hub: None,
            });
        };

        let listener = SharedListener::bind(&config.listener).await?;
        let local_addr = listener.local_addr();
        let mut signal = shutdown.subscribe();
        let service = app
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        let task = tokio::spawn(async move {
            let served = axum::serve(listener.into_inner(), service)
                .with_graceful_shutdown(async move { signal.recv().await })
                .await;
            if let Err(e) = served {
                tracing::error!(error = %e, "Server terminated with error");
            }
        });

        Ok(RunningServer {
            local_addr: Some(local_addr),
            shutdown,
            task: Some(task),
            hub: app.hub,
        })
    }

    /// Stop serving and close the listener. No-op when already stopped.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        let Some(running) = inner.running.take() else {
            tracing::debug!("Stop requested while already stopped");
            return;
        };

        inner.transition(SubsystemState::Running, SubsystemState::Stopping);
        if let Some(hub) = &running.hub {
            tracing::info!(sockets = hub.len(), "Closing sockets");
        }
        running.shutdown.trigger();

        if let Some(task) = running.task {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Server task failed");
            }
        }

        inner.transition(SubsystemState::Stopping, SubsystemState::Stopped);
        tracing::info!("Listener closed");
        let _ = self.events.send(LifecycleEvent::Dead);
    }
}

impl Drop for LifecycleController {
    fn drop(&mut self) {
        if let Some(running) = &self.inner.get_mut().running {
            running.shutdown.trigger();
        }
    }
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionRegistry;

    fn controller() -> LifecycleController {
        LifecycleController::new(Arc::new(ActionRegistry::new()))
    }

    fn local_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();
        config
    }

    #[tokio::test]
    async fn start_and_stop_are_idempotent() {
        let controller = controller();
        let mut events = controller.subscribe();
        let config = local_config();

        let addr = controller.start(&config).await.unwrap().unwrap();
        assert_eq!(controller.start(&config).await.unwrap(), Some(addr));
        assert_eq!(controller.state(Subsystem::Http).await, SubsystemState::Running);
        assert_eq!(controller.state(Subsystem::Messaging).await, SubsystemState::Running);
        assert_eq!(
            events.recv().await.unwrap(),
            LifecycleEvent::Ready {
                local_addr: Some(addr)
            }
        );

        controller.stop().await;
        controller.stop().await;
        assert_eq!(controller.state(Subsystem::Http).await, SubsystemState::Stopped);
        assert_eq!(events.recv().await.unwrap(), LifecycleEvent::Dead);
        assert!(events.try_recv().is_err());
        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn disabled_subsystems_open_no_listener() {
        let controller = controller();
        let mut config = local_config();
        config.express.enabled = false;
        config.socket_io.enabled = false;

        assert_eq!(controller.start(&config).await.unwrap(), None);
        assert!(controller.is_running().await);
        assert_eq!(controller.state(Subsystem::Http).await, SubsystemState::Stopped);
        controller.stop().await;
        assert!(!controller.is_running().await);
    }

    #[tokio::test]
    async fn failed_start_leaves_everything_stopped() {
        let controller = controller();
        let mut config = local_config();
        config.listener.bind_address = "nope".into();

        assert!(controller.start(&config).await.is_err());
        assert_eq!(controller.state(Subsystem::Http).await, SubsystemState::Stopped);
        assert_eq!(controller.state(Subsystem::Messaging).await, SubsystemState::Stopped);
        assert!(!controller.is_running().await);
    }

    #[tokio::test]
    async fn restart_after_stop() {
        let controller = controller();
        let config = local_config();
        controller.start(&config).await.unwrap();
        controller.stop().await;
        assert!(controller.start(&config).await.unwrap().is_some());
        controller.stop().await;
    }
}
