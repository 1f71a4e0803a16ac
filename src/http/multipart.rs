//! Multipart form parsing with uploads spooled to temporary files.
//!
//! # Responsibilities
//! - Parse `multipart/form-data` bodies
//! - Stream file parts to disk and describe them as [`UploadedFile`]
//! - Feed text parts through the same key syntax as URL-encoded forms
//!
//! # Design Decisions
//! - Uploads are written chunk by chunk; a file never sits fully in memory
//! - Temp files are removed when the descriptor is dropped unless persisted
//! - Parts without a field name are skipped

use std::path::{Path, PathBuf};

use axum::extract::{FromRequest, Multipart, Request};
use axum::http::StatusCode;
use serde_json::{json, Value};
use tempfile::{NamedTempFile, TempPath};
use tokio::io::AsyncWriteExt;

use crate::http::params::{ExtractError, ExtractOptions, FormBuilder, Params};

/// An uploaded file held in temporary storage.
#[derive(Debug)]
pub struct UploadedFile {
    pub field_name: String,
    /// Filename supplied by the client, if any.
    pub original_filename: Option<String>,
    pub size_bytes: u64,
    /// Content-Transfer-Encoding of the part, when declared.
    pub encoding: Option<String>,
    pub content_type: Option<String>,
    path: TempPath,
}

impl UploadedFile {
    /// Location of the temp file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole upload into memory.
    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(self.path()).await
    }

    /// Move the upload to `dest`; it is no longer deleted on drop.
    pub fn persist(self, dest: impl AsRef<Path>) -> std::io::Result<()> {
        self.path.persist(dest).map_err(|e| e.error)
    }

    /// Descriptor without the file contents.
    pub fn to_json(&self) -> Value {
        json!({
            "fieldName": self.field_name,
            "originalFilename": self.original_filename,
            "path": self.path().display().to_string(),
            "size": self.size_bytes,
            "encoding": self.encoding,
            "contentType": self.content_type,
        })
    }
}

fn field_error(err: axum::extract::multipart::MultipartError, limit: usize) -> ExtractError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ExtractError::TooLarge { limit }
    } else {
        ExtractError::Malformed(err.body_text())
    }
}

async fn temp_file(dir: Option<PathBuf>) -> Result<NamedTempFile, ExtractError> {
    let created = tokio::task::spawn_blocking(move || match dir {
        Some(dir) => NamedTempFile::new_in(dir),
        None => NamedTempFile::new(),
    })
    .await
    .map_err(|e| ExtractError::Storage(std::io::Error::other(e)))?;
    Ok(created?)
}

/// Parse a multipart body into parameters.
pub(crate) async fn extract(
    request: Request,
    options: &ExtractOptions,
) -> Result<Params, ExtractError> {
    let limit = options.max_body_size;
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| ExtractError::Malformed(e.body_text()))?;

    let mut form = FormBuilder::default();
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| field_error(e, limit))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            tracing::debug!("Skipping multipart part without a name");
            continue;
        };

        let Some(filename) = field.file_name().map(str::to_string) else {
            let text = field.text().await.map_err(|e| field_error(e, limit))?;
            form.push(&name, Value::String(text));
            continue;
        };

        let content_type = field.content_type().map(str::to_string);
        let encoding = field
            .headers()
            .get("content-transfer-encoding")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let (file, path) = temp_file(options.upload_dir.clone()).await?.into_parts();
        let mut file = tokio::fs::File::from_std(file);
        let mut size_bytes = 0u64;
        while let Some(chunk) = field.chunk().await.map_err(|e| field_error(e, limit))? {
            size_bytes += chunk.len() as u64;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        tracing::debug!(
            field = %name,
            filename = %filename,
            size_bytes,
            "Upload stored"
        );

        form.push_file(
            &name,
            UploadedFile {
                field_name: name.clone(),
                original_filename: Some(filename),
                size_bytes,
                encoding,
                content_type,
                path,
            },
        );
    }

    Ok(form.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::params::Param;
    use axum::body::Body;
    use axum::http::header;

    const BOUNDARY: &str = "XBOUNDARYX";

    fn multipart_request(body: String) -> Request {
        Request::builder()
            .method("POST")
            .uri("/postMultipart")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn text_part(name: &str, value: &str) -> String {
        format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
    }

    fn file_part(name: &str, filename: &str, value: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: text/plain\r\n\r\n{value}\r\n"
        )
    }

    #[tokio::test]
    async fn text_and_file_parts() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!(
            "{}{}--{BOUNDARY}--\r\n",
            text_part("foo", "bar"),
            file_part("upload", "foo.txt", "foo bar baz"),
        );
        let options = ExtractOptions {
            upload_dir: Some(dir.path().to_path_buf()),
            ..ExtractOptions::default()
        };

        let params = extract(multipart_request(body), &options).await.unwrap();
        assert_eq!(params.str("foo"), Some("bar"));

        let file = params.file("upload").unwrap();
        assert_eq!(file.field_name, "upload");
        assert_eq!(file.original_filename.as_deref(), Some("foo.txt"));
        assert_eq!(file.size_bytes, 11);
        assert_eq!(file.content_type.as_deref(), Some("text/plain"));
        assert!(file.path().starts_with(dir.path()));
        assert_eq!(file.read().await.unwrap(), b"foo bar baz");
    }

    #[tokio::test]
    async fn repeated_file_field_becomes_list() {
        let body = format!(
            "{}{}--{BOUNDARY}--\r\n",
            file_part("docs", "a.txt", "a"),
            file_part("docs", "b.txt", "bb"),
        );

        let params = extract(multipart_request(body), &ExtractOptions::default())
            .await
            .unwrap();
        match params.get("docs") {
            Some(Param::Files(files)) => {
                assert_eq!(files.len(), 2);
                assert_eq!(files[1].size_bytes, 2);
            }
            other => panic!("expected file list, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn temp_file_removed_on_drop() {
        let body = format!("{}--{BOUNDARY}--\r\n", file_part("f", "x.txt", "x"));
        let params = extract(multipart_request(body), &ExtractOptions::default())
            .await
            .unwrap();
        let path = params.file("f").unwrap().path().to_path_buf();
        assert!(path.exists());
        drop(params);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn persist_keeps_file() {
        let dir = tempfile::tempdir().unwrap();
        let body = format!("{}--{BOUNDARY}--\r\n", file_part("f", "x.txt", "keep"));
        let mut params = extract(multipart_request(body), &ExtractOptions::default())
            .await
            .unwrap();

        let Some(Param::File(file)) = params.remove("f") else {
            panic!("expected single file");
        };
        let dest = dir.path().join("kept.txt");
        file.persist(&dest).unwrap();
        assert_eq!(std::fs::read_to_string(dest).unwrap(), "keep");
    }

    #[tokio::test]
    async fn missing_boundary_is_malformed() {
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "multipart/form-data")
            .body(Body::from("garbage"))
            .unwrap();
        let err = extract(request, &ExtractOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Malformed(_)));
    }
}
