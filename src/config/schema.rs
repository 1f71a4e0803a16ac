//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the dispatch server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::routing::Verb;

/// Root configuration for the dispatch server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Working directory used to resolve relative file-download paths.
    pub cwd: PathBuf,

    /// Shared listener configuration.
    pub listener: ListenerConfig,

    /// HTTP action-dispatch subsystem.
    pub express: ExpressConfig,

    /// Real-time messaging subsystem.
    #[serde(rename = "socket-io", alias = "socket_io")]
    pub socket_io: SocketIoConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cwd: PathBuf::from("."),
            listener: ListenerConfig::default(),
            express: ExpressConfig::default(),
            socket_io: SocketIoConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Default listener port shared by both subsystems.
pub const DEFAULT_PORT: u16 = 3000;

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: format!("0.0.0.0:{DEFAULT_PORT}"),
        }
    }
}

/// HTTP subsystem configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExpressConfig {
    /// Enable the HTTP subsystem.
    pub enabled: bool,

    /// Route descriptors, in registration order.
    pub routes: Vec<RouteEntry>,

    /// Emit an access log line per request.
    pub logger: bool,

    /// Maximum request body size in bytes (JSON, form and multipart alike).
    pub max_body_size: usize,

    /// Directory for multipart upload temp files (system temp dir when unset).
    pub upload_dir: Option<PathBuf>,

    /// Optional per-request timeout. Requests run to completion when unset.
    pub request_timeout_secs: Option<u64>,
}

impl Default for ExpressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            routes: Vec::new(),
            logger: true,
            max_body_size: 10 * 1024 * 1024, // 10MB
            upload_dir: None,
            request_timeout_secs: None,
        }
    }
}

/// A single route entry, keyed by its verb.
///
/// Deserializes from a one-key table such as `{ get = { path = "/get", file = "action/get" } }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteEntry {
    Get(RouteSpec),
    Post(RouteSpec),
    Put(RouteSpec),
    Patch(RouteSpec),
    Delete(RouteSpec),
    Head(RouteSpec),
}

impl RouteEntry {
    /// The verb this entry binds.
    pub fn verb(&self) -> Verb {
        match self {
            RouteEntry::Get(_) => Verb::Get,
            RouteEntry::Post(_) => Verb::Post,
            RouteEntry::Put(_) => Verb::Put,
            RouteEntry::Patch(_) => Verb::Patch,
            RouteEntry::Delete(_) => Verb::Delete,
            RouteEntry::Head(_) => Verb::Head,
        }
    }

    /// The path/handler part of the entry.
    pub fn spec(&self) -> &RouteSpec {
        match self {
            RouteEntry::Get(spec)
            | RouteEntry::Post(spec)
            | RouteEntry::Put(spec)
            | RouteEntry::Patch(spec)
            | RouteEntry::Delete(spec)
            | RouteEntry::Head(spec) => spec,
        }
    }
}

/// Path and handler binding for a route entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RouteSpec {
    /// Request path (exact match).
    pub path: String,

    /// Handler identifier, resolved relative to the working directory.
    pub file: String,

    /// Optional sub-methods accepted as a trailing path segment.
    #[serde(default)]
    pub methods: Option<Vec<String>>,
}

/// Messaging subsystem configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SocketIoConfig {
    /// Enable the messaging subsystem.
    pub enabled: bool,

    /// Messaging event verbosity (0 = errors only, 3 = every frame).
    #[serde(rename = "logLevel", alias = "log_level")]
    pub log_level: u8,

    /// Upgrade path for socket connections.
    pub path: String,
}

impl Default for SocketIoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: 1,
            path: "/socket.io".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
