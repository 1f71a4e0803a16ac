//! Response encoding.
//!
//! # Responsibilities
//! - Turn an action [`Reply`] into an HTTP response
//! - Produce the fixed-format error bodies (404, 405, error JSON)
//! - Render JSON values as XML
//!
//! # Design Decisions
//! - JSON is the default encoding; other encodings are explicit reply variants
//! - Relative file paths resolve against the configured working directory
//! - File content types come from the extension unless overridden

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use thiserror::Error;

use crate::action::Reply;
use crate::routing::Verb;

pub const CONTENT_TYPE_JSON: &str = "application/json; charset=utf8";
pub const CONTENT_TYPE_XML: &str = "application/xml";
pub const CONTENT_TYPE_TEXT: &str = "text/plain";
pub const CONTENT_TYPE_BINARY: &str = "application/octet-stream";

/// Root element of XML replies.
const XML_ROOT: &str = "response";
/// Element used for members of a top-level or nested array.
const XML_ITEM: &str = "item";

/// Errors raised while encoding a reply.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("failed to serialize reply: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to read {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid header value: {0}")]
    Header(String),
}

/// Encodes action replies into responses.
#[derive(Debug, Clone)]
pub struct ResponseEncoder {
    base_dir: PathBuf,
}

impl ResponseEncoder {
    /// `base_dir` anchors relative file paths.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub async fn encode(&self, reply: Reply) -> Result<Response, EncodeError> {
        match reply {
            Reply::Json(value) => Ok(json_response(StatusCode::OK, &value)?),
            Reply::Xml(value) => Ok(with_content_type(
                StatusCode::OK,
                Body::from(to_xml(&value)),
                CONTENT_TYPE_XML,
            )?),
            Reply::Raw { body, content_type } => Ok(with_content_type(
                StatusCode::OK,
                Body::from(body),
                content_type.as_deref().unwrap_or(CONTENT_TYPE_TEXT),
            )?),
            Reply::File {
                path,
                filename,
                content_type,
            } => self.encode_file(path, filename, content_type).await,
        }
    }

    async fn encode_file(
        &self,
        path: PathBuf,
        filename: Option<String>,
        content_type: Option<String>,
    ) -> Result<Response, EncodeError> {
        let path = if path.is_absolute() {
            path
        } else {
            self.base_dir.join(path)
        };
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| EncodeError::File {
                path: path.clone(),
                source,
            })?;

        let filename = filename.unwrap_or_else(|| {
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "download".to_string())
        });
        let content_type = content_type.unwrap_or_else(|| {
            content_type_for(Path::new(&filename))
                .or_else(|| content_type_for(&path))
                .unwrap_or(CONTENT_TYPE_BINARY)
                .to_string()
        });

        let mut response = with_content_type(StatusCode::OK, Body::from(bytes), &content_type)?;
        let disposition = format!(
            "attachment; filename=\"{}\"",
            filename.replace('\\', "\\\\").replace('"', "\\\"")
        );
        response.headers_mut().insert(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_str(&disposition).map_err(|_| EncodeError::Header(disposition))?,
        );
        Ok(response)
    }
}

fn with_content_type(
    status: StatusCode,
    body: Body,
    content_type: &str,
) -> Result<Response, EncodeError> {
    let value = HeaderValue::from_str(content_type)
        .map_err(|_| EncodeError::Header(content_type.to_string()))?;
    Ok((status, [(header::CONTENT_TYPE, value)], body).into_response())
}

/// Serialize `value` as a JSON response.
pub fn json_response(status: StatusCode, value: &Value) -> Result<Response, EncodeError> {
    let body = serde_json::to_vec(value)?;
    Ok((
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON))],
        body,
    )
        .into_response())
}

/// `{"status": "error", "message": ...}` with the given status.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    let body = json!({ "status": "error", "message": message }).to_string();
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON))],
        body,
    )
        .into_response()
}

/// `Cannot <METHOD> <path>` in plain text.
pub fn not_found(method: &str, path: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_TEXT))],
        format!("Cannot {method} {path}\n"),
    )
        .into_response()
}

/// 405 listing the verbs registered for the path.
pub fn method_not_allowed(allowed: &[Verb]) -> Response {
    let mut methods: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
    if allowed.contains(&Verb::Get) && !allowed.contains(&Verb::Head) {
        methods.push(Verb::Head.to_string());
    }
    let allow = methods.join(", ");

    let mut response = (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_TEXT))],
        "Method Not Allowed\n",
    )
        .into_response();
    if let Ok(value) = HeaderValue::from_str(&allow) {
        response.headers_mut().insert(header::ALLOW, value);
    }
    response
}

/// Content type inferred from a file extension.
pub fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let content_type = match ext.as_str() {
        "txt" | "text" | "log" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "md" => "text/markdown",
        "js" | "mjs" => "application/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "wasm" => "application/wasm",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => return None,
    };
    Some(content_type)
}

/// Render a JSON value as an XML document under a `response` root.
///
/// Object keys become elements, arrays repeat their element, `null`
/// becomes an empty element. Characters not valid in element names are
/// replaced with `_`.
pub fn to_xml(value: &Value) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    match value {
        Value::Array(items) => {
            out.push_str("<response>");
            for item in items {
                write_element(&mut out, XML_ITEM, item);
            }
            out.push_str("</response>");
        }
        other => write_element(&mut out, XML_ROOT, other),
    }
    out
}

fn write_element(out: &mut String, name: &str, value: &Value) {
    let name = xml_name(name);
    match value {
        Value::Null => {
            let _ = write!(out, "<{name}/>");
        }
        Value::Array(items) => {
            let _ = write!(out, "<{name}>");
            for item in items {
                write_element(out, XML_ITEM, item);
            }
            let _ = write!(out, "</{name}>");
        }
        Value::Object(map) => {
            let _ = write!(out, "<{name}>");
            for (key, child) in map {
                match child {
                    Value::Array(items) => {
                        for item in items {
                            write_element(out, key, item);
                        }
                    }
                    _ => write_element(out, key, child),
                }
            }
            let _ = write!(out, "</{name}>");
        }
        Value::String(s) => {
            let _ = write!(out, "<{name}>{}</{name}>", escape_xml(s));
        }
        Value::Bool(b) => {
            let _ = write!(out, "<{name}>{b}</{name}>");
        }
        Value::Number(n) => {
            let _ = write!(out, "<{name}>{n}</{name}>");
        }
    }
}

fn xml_name(raw: &str) -> String {
    let mut name: String = raw
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let valid_start = name
        .chars()
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_');
    if !valid_start {
        name.insert(0, '_');
    }
    name
}

fn escape_xml(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
