//! Request parameter extraction.
//!
//! # Responsibilities
//! - Parse the query string into parameters
//! - Parse JSON, URL-encoded and multipart bodies by declared content type
//! - Merge everything into one flat mapping (body overrides query)
//!
//! # Key Syntax
//! ```text
//! key=v              → "v"
//! key=a&key=b        → ["a", "b"]
//! key[]=a&key[]=b    → ["a", "b"]
//! key[1]=b&key[0]=a  → ["a", "b"]   (ordered by index)
//! key[name]=v        → {"name": "v"}
//! ```
//!
//! # Design Decisions
//! - Unknown body content types are left unread
//! - A JSON body must be an object; anything else is malformed
//! - Declared Content-Length above the limit is rejected before reading

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::path::PathBuf;

use axum::body::Bytes;
use axum::extract::Request;
use axum::http::{header, HeaderMap};
use futures_util::StreamExt;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::http::multipart::{self, UploadedFile};

/// Errors raised while extracting parameters.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The body could not be parsed.
    #[error("{0}")]
    Malformed(String),

    /// The body exceeds the configured limit.
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    /// Upload temp storage failed.
    #[error("upload storage failed: {0}")]
    Storage(#[from] std::io::Error),
}

/// Limits and storage settings for extraction.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub max_body_size: usize,
    pub upload_dir: Option<PathBuf>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_body_size: 10 * 1024 * 1024,
            upload_dir: None,
        }
    }
}

/// A single extracted parameter.
#[derive(Debug)]
pub enum Param {
    /// Scalar, sequence or object value.
    Value(Value),
    /// One uploaded file.
    File(UploadedFile),
    /// Several files uploaded under the same field name.
    Files(Vec<UploadedFile>),
}

impl Param {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Param::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn as_file(&self) -> Option<&UploadedFile> {
        match self {
            Param::File(file) => Some(file),
            Param::Files(files) => files.first(),
            Param::Value(_) => None,
        }
    }

    /// JSON view. Files are described, not inlined.
    pub fn to_json(&self) -> Value {
        match self {
            Param::Value(v) => v.clone(),
            Param::File(file) => file.to_json(),
            Param::Files(files) => Value::Array(files.iter().map(UploadedFile::to_json).collect()),
        }
    }
}

/// Flat parameter mapping handed to actions.
#[derive(Debug, Default)]
pub struct Params {
    inner: HashMap<String, Param>,
}

impl Params {
    pub fn get(&self, name: &str) -> Option<&Param> {
        self.inner.get(name)
    }

    /// String value of a scalar parameter.
    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Param::as_str)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(Param::as_value)
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.get(name).and_then(Param::as_file)
    }

    pub fn insert(&mut self, name: impl Into<String>, param: Param) -> Option<Param> {
        self.inner.insert(name.into(), param)
    }

    /// Take ownership of a parameter (e.g. to persist an upload).
    pub fn remove(&mut self, name: &str) -> Option<Param> {
        self.inner.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Param)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merge `other` into `self`; keys in `other` win.
    pub fn merge(&mut self, other: Params) {
        self.inner.extend(other.inner);
    }

    pub fn to_json(&self) -> Value {
        Value::Object(
            self.inner
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

/// Position part of a bracketed key.
#[derive(Debug, PartialEq, Eq)]
enum KeyIndex<'a> {
    None,
    Position(usize),
    Append,
    Field(&'a str),
}

/// Split `base[index]` into its parts. Anything else is a plain key.
fn parse_key(raw: &str) -> (&str, KeyIndex<'_>) {
    let Some(open) = raw.find('[') else {
        return (raw, KeyIndex::None);
    };
    let Some(inner) = raw[open + 1..].strip_suffix(']') else {
        return (raw, KeyIndex::None);
    };
    if open == 0 || inner.contains(['[', ']']) {
        return (raw, KeyIndex::None);
    }

    let base = &raw[..open];
    let index = if inner.is_empty() {
        KeyIndex::Append
    } else if let Ok(position) = inner.parse() {
        KeyIndex::Position(position)
    } else {
        KeyIndex::Field(inner)
    };
    (base, index)
}

enum Slot {
    Scalar(Value),
    Sequence(Vec<(Option<usize>, Value)>),
    Object(Map<String, Value>),
}

impl Slot {
    fn append(&mut self, position: Option<usize>, value: Value) {
        match self {
            Slot::Scalar(old) => {
                let old = std::mem::take(old);
                *self = Slot::Sequence(vec![(None, old), (position, value)]);
            }
            Slot::Sequence(items) => items.push((position, value)),
            Slot::Object(_) => *self = Slot::Sequence(vec![(position, value)]),
        }
    }

    fn finish(self) -> Value {
        match self {
            Slot::Scalar(value) => value,
            Slot::Sequence(mut items) => {
                items.sort_by_key(|(position, _)| position.unwrap_or(usize::MAX));
                Value::Array(items.into_iter().map(|(_, v)| v).collect())
            }
            Slot::Object(map) => Value::Object(map),
        }
    }
}

/// Accumulates form-style key/value pairs and uploaded files.
#[derive(Default)]
pub(crate) struct FormBuilder {
    slots: HashMap<String, Slot>,
    files: HashMap<String, Vec<UploadedFile>>,
}

impl FormBuilder {
    pub(crate) fn push(&mut self, key: &str, value: Value) {
        let (base, index) = parse_key(key);
        let position = match index {
            KeyIndex::Field(field) => {
                let slot = self
                    .slots
                    .entry(base.to_string())
                    .or_insert_with(|| Slot::Object(Map::new()));
                if !matches!(slot, Slot::Object(_)) {
                    *slot = Slot::Object(Map::new());
                }
                if let Slot::Object(map) = slot {
                    map.insert(field.to_string(), value);
                }
                return;
            }
            KeyIndex::None => {
                match self.slots.entry(base.to_string()) {
                    Entry::Vacant(e) => {
                        e.insert(Slot::Scalar(value));
                    }
                    Entry::Occupied(mut e) => e.get_mut().append(None, value),
                }
                return;
            }
            KeyIndex::Position(position) => Some(position),
            KeyIndex::Append => None,
        };

        match self.slots.entry(base.to_string()) {
            Entry::Vacant(e) => {
                e.insert(Slot::Sequence(vec![(position, value)]));
            }
            Entry::Occupied(mut e) => e.get_mut().append(position, value),
        }
    }

    pub(crate) fn push_file(&mut self, key: &str, file: UploadedFile) {
        let (base, _) = parse_key(key);
        self.files.entry(base.to_string()).or_default().push(file);
    }

    pub(crate) fn finish(self) -> Params {
        let mut params = Params::default();
        for (key, slot) in self.slots {
            params.insert(key, Param::Value(slot.finish()));
        }
        for (key, mut files) in self.files {
            let param = if files.len() == 1 {
                Param::File(files.remove(0))
            } else {
                Param::Files(files)
            };
            params.insert(key, param);
        }
        params
    }
}

/// Parse `application/x-www-form-urlencoded` data (query strings included).
pub fn parse_urlencoded(input: &[u8]) -> Params {
    let mut form = FormBuilder::default();
    for (key, value) in url::form_urlencoded::parse(input) {
        if key.is_empty() {
            continue;
        }
        form.push(&key, Value::String(value.into_owned()));
    }
    form.finish()
}

/// Parse a JSON body. The top level must be an object.
pub fn parse_json(input: &[u8]) -> Result<Params, ExtractError> {
    if input.iter().all(u8::is_ascii_whitespace) {
        return Ok(Params::default());
    }
    let value: Value = serde_json::from_slice(input)
        .map_err(|e| ExtractError::Malformed(format!("invalid JSON body: {e}")))?;
    let Value::Object(map) = value else {
        return Err(ExtractError::Malformed(
            "JSON body must be an object".to_string(),
        ));
    };

    let mut params = Params::default();
    for (key, value) in map {
        params.insert(key, Param::Value(value));
    }
    Ok(params)
}

#[derive(Debug, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
    Multipart,
    Other,
}

impl BodyKind {
    fn of(headers: &HeaderMap) -> Self {
        let Some(content_type) = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        else {
            return BodyKind::Other;
        };
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "application/json" => BodyKind::Json,
            "application/x-www-form-urlencoded" => BodyKind::Form,
            "multipart/form-data" => BodyKind::Multipart,
            other if other.ends_with("+json") => BodyKind::Json,
            _ => BodyKind::Other,
        }
    }
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

async fn read_body(request: Request, limit: usize) -> Result<Bytes, ExtractError> {
    if declared_length(request.headers()).is_some_and(|len| len > limit) {
        return Err(ExtractError::TooLarge { limit });
    }
    let mut stream = request.into_body().into_data_stream();
    let mut body = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk
            .map_err(|e| ExtractError::Malformed(format!("failed to read request body: {e}")))?;
        if body.len() + chunk.len() > limit {
            return Err(ExtractError::TooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(body))
}

/// Extract query and body parameters from a request.
pub async fn extract(request: Request, options: &ExtractOptions) -> Result<Params, ExtractError> {
    let mut params = request
        .uri()
        .query()
        .map(|q| parse_urlencoded(q.as_bytes()))
        .unwrap_or_default();

    let body = match BodyKind::of(request.headers()) {
        BodyKind::Json => parse_json(&read_body(request, options.max_body_size).await?)?,
        BodyKind::Form => parse_urlencoded(&read_body(request, options.max_body_size).await?),
        BodyKind::Multipart => {
            if declared_length(request.headers()).is_some_and(|len| len > options.max_body_size) {
                return Err(ExtractError::TooLarge {
                    limit: options.max_body_size,
                });
            }
            multipart::extract(request, options).await?
        }
        BodyKind::Other => Params::default(),
    };

    params.merge(body);
    Ok(params)
}
