//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (body limit > 0, addresses parse)
//! - Check route descriptors are well-formed before the route table is built
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Duplicate routes are reported by the route table itself at startup

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AppConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("express.max_body_size must be greater than zero")]
    BodyLimit,

    #[error("route #{index}: path `{path}` must start with '/'")]
    RoutePath { index: usize, path: String },

    #[error("route #{index}: handler file must not be empty")]
    RouteFile { index: usize },

    #[error("route #{index}: sub-method `{method}` must be a non-empty path segment")]
    SubMethod { index: usize, method: String },

    #[error("socket-io.path `{0}` must start with '/'")]
    MessagingPath(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.express.max_body_size == 0 {
        errors.push(ValidationError::BodyLimit);
    }

    for (index, entry) in config.express.routes.iter().enumerate() {
        let spec = entry.spec();
        if !spec.path.starts_with('/') {
            errors.push(ValidationError::RoutePath {
                index,
                path: spec.path.clone(),
            });
        }
        if spec.file.trim().is_empty() {
            errors.push(ValidationError::RouteFile { index });
        }
        for method in spec.methods.iter().flatten() {
            if method.is_empty() || method.contains('/') {
                errors.push(ValidationError::SubMethod {
                    index,
                    method: method.clone(),
                });
            }
        }
    }

    if !config.socket_io.path.starts_with('/') {
        errors.push(ValidationError::MessagingPath(config.socket_io.path.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{RouteEntry, RouteSpec};

    fn route(path: &str, file: &str, methods: Option<Vec<&str>>) -> RouteEntry {
        RouteEntry::Get(RouteSpec {
            path: path.into(),
            file: file.into(),
            methods: methods.map(|m| m.into_iter().map(String::from).collect()),
        })
    }

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&AppConfig::default()), Ok(()));
    }

    #[test]
    fn collects_every_error() {
        let mut config = AppConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.express.max_body_size = 0;
        config.express.routes.push(route("get", "", None));
        config.express.routes.push(route("/ok", "action/ok", Some(vec!["a/b", ""])));

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::BindAddress("nowhere".into()),
                ValidationError::BodyLimit,
                ValidationError::RoutePath { index: 0, path: "get".into() },
                ValidationError::RouteFile { index: 0 },
                ValidationError::SubMethod { index: 1, method: "a/b".into() },
                ValidationError::SubMethod { index: 1, method: "".into() },
            ]
        );
    }
}
