//! Action results: replies with a content directive, and explicit errors.

use std::path::PathBuf;

use axum::body::Bytes;
use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// A handler result tagged with how it should be encoded.
///
/// `Json` is the default encoding; the other variants are explicit directives.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Serialize the value as a JSON document.
    Json(Value),
    /// Serialize the value as XML under a `response` root element.
    Xml(Value),
    /// Send the bytes verbatim (`text/plain` unless a type is given).
    Raw {
        body: Bytes,
        content_type: Option<String>,
    },
    /// Send a file as an attachment.
    File {
        path: PathBuf,
        filename: Option<String>,
        content_type: Option<String>,
    },
}

impl Reply {
    pub fn json(value: impl Into<Value>) -> Self {
        Reply::Json(value.into())
    }

    /// Serialize any `Serialize` type into a JSON reply.
    pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, ActionError> {
        serde_json::to_value(value)
            .map(Reply::Json)
            .map_err(|e| ActionError::internal(format!("unserializable reply: {e}")))
    }

    pub fn xml(value: impl Into<Value>) -> Self {
        Reply::Xml(value.into())
    }

    pub fn raw(body: impl Into<Bytes>) -> Self {
        Reply::Raw {
            body: body.into(),
            content_type: None,
        }
    }

    pub fn raw_with_type(body: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Reply::Raw {
            body: body.into(),
            content_type: Some(content_type.into()),
        }
    }

    /// Send the file at `path`, named after its final path component.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Reply::File {
            path: path.into(),
            filename: None,
            content_type: None,
        }
    }

    /// Send the file at `path` under a different download name.
    pub fn file_named(path: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Reply::File {
            path: path.into(),
            filename: Some(filename.into()),
            content_type: None,
        }
    }

    /// Override the content type of a raw or file reply. No-op for JSON and XML.
    pub fn with_content_type(mut self, value: impl Into<String>) -> Self {
        match &mut self {
            Reply::Raw { content_type, .. } | Reply::File { content_type, .. } => {
                *content_type = Some(value.into());
            }
            Reply::Json(_) | Reply::Xml(_) => {}
        }
        self
    }

    /// Short name of the encoding, for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Json(_) => "json",
            Reply::Xml(_) => "xml",
            Reply::Raw { .. } => "raw",
            Reply::File { .. } => "file",
        }
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Json(value)
    }
}

/// An error deliberately returned by an action.
///
/// The status and message are sent to the client as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ActionError {
    status: StatusCode,
    message: String,
}

impl ActionError {
    /// An error with the default status (500).
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(message)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn errors_default_to_500() {
        let err = ActionError::new("boom");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn content_type_override_only_touches_raw_and_file() {
        let raw = Reply::raw("a,b").with_content_type("text/csv");
        assert_eq!(
            raw,
            Reply::Raw {
                body: Bytes::from_static(b"a,b"),
                content_type: Some("text/csv".into())
            }
        );
        let json = Reply::json(json!([1])).with_content_type("text/csv");
        assert_eq!(json, Reply::Json(json!([1])));
    }

    #[test]
    fn serialize_builds_json_reply() {
        #[derive(Serialize)]
        struct Status {
            status: &'static str,
        }
        let reply = Reply::serialize(&Status { status: "ok" }).unwrap();
        assert_eq!(reply, Reply::json(json!({ "status": "ok" })));
        assert_eq!(reply.kind(), "json");
    }
}
