//! Verb and path matching logic.
//!
//! # Responsibilities
//! - Map configured verbs onto HTTP methods
//! - Normalize request paths before lookup
//! - Split a request path into a base path and a trailing sub-method segment
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - One trailing slash is insignificant (`/get/` matches `/get`)
//! - GET routes also answer HEAD (the transport strips the body)
//! - No regex, no wildcards: exact segments only

use std::fmt;

use axum::http::Method;
use serde::{Deserialize, Serialize};

/// The fixed set of verbs a route may bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl Verb {
    /// The HTTP method this verb registers.
    pub fn method(self) -> Method {
        match self {
            Verb::Get => Method::GET,
            Verb::Post => Method::POST,
            Verb::Put => Method::PUT,
            Verb::Patch => Method::PATCH,
            Verb::Delete => Method::DELETE,
            Verb::Head => Method::HEAD,
        }
    }

    /// Returns true if a request with `method` is served by this verb.
    pub fn matches(self, method: &Method) -> bool {
        *method == self.method() || (self == Verb::Get && *method == Method::HEAD)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method().as_str())
    }
}

/// Strip one insignificant trailing slash.
pub fn normalize_path(path: &str) -> &str {
    if path.len() > 1 {
        path.strip_suffix('/').unwrap_or(path)
    } else {
        path
    }
}

/// Split `/base/segment` into (`/base`, `segment`).
///
/// Returns `None` for the root path or when the final segment is empty.
/// A single-segment path splits into (`/`, `segment`).
pub fn split_sub_method(path: &str) -> Option<(&str, &str)> {
    let idx = path.rfind('/')?;
    let segment = &path[idx + 1..];
    if segment.is_empty() {
        return None;
    }
    let base = if idx == 0 { "/" } else { &path[..idx] };
    Some((base, segment))
}
