//! Helper types and traits for cleaner route handlers.
//!
//! Provides extension traits for converting `Option` and `Result` types
//! into HTTP-appropriate error responses, and a collector for multipart forms.

use axum::Json;
use axum::body::Body;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum_extra::extract::Multipart;
use bytes::Bytes;
use doc_translator_core::util::safe_file_name;
use std::collections::HashMap;
use std::path::Path;

/// Standard result type for route handlers.
pub type RouteResult<T> = Result<T, (StatusCode, String)>;

/// Error carried as `{"error": "..."}`, used by the JSON-only endpoints.
pub struct JsonError(pub StatusCode, pub String);

impl IntoResponse for JsonError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({ "error": self.1 }))).into_response()
    }
}

impl From<(StatusCode, String)> for JsonError {
    fn from((status, message): (StatusCode, String)) -> Self {
        Self(status, message)
    }
}

/// Extension trait for converting `Option<T>` to `RouteResult<T>`.
pub trait OptionExt<T> {
    /// Returns the contained value or a 404 Not Found error.
    fn or_not_found(self, msg: &str) -> RouteResult<T>;

    /// Returns the contained value or a 400 Bad Request error.
    fn or_missing(self, msg: &str) -> RouteResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, msg: &str) -> RouteResult<T> {
        self.ok_or_else(|| (StatusCode::NOT_FOUND, msg.to_string()))
    }

    fn or_missing(self, msg: &str) -> RouteResult<T> {
        self.ok_or_else(|| (StatusCode::BAD_REQUEST, msg.to_string()))
    }
}

/// Extension trait for converting `Result<T, E>` to `RouteResult<T>`.
pub trait ResultExt<T, E: std::fmt::Display> {
    /// Converts the error to 500 Internal Server Error.
    fn or_internal_error(self) -> RouteResult<T>;

    /// Converts the error to 400 Bad Request.
    fn or_bad_request(self) -> RouteResult<T>;

    /// Converts the error to 500 with `context` in front of the message.
    fn or_internal_with(self, context: &str) -> RouteResult<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T, E> for Result<T, E> {
    fn or_internal_error(self) -> RouteResult<T> {
        self.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
    }

    fn or_bad_request(self) -> RouteResult<T> {
        self.map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
    }

    fn or_internal_with(self, context: &str) -> RouteResult<T> {
        self.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{context}: {e}")))
    }
}

/// An uploaded file part.
pub struct UploadedFile {
    pub file_name: String,
    pub data: Bytes,
}

/// A multipart form read to the end: files by field name, text fields by name.
///
/// Empty file parts (a file input left blank) are dropped.
#[derive(Default)]
pub struct UploadForm {
    files: HashMap<String, UploadedFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> RouteResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await.or_bad_request()? {
            let name = field.name().unwrap_or("").to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let data = field.bytes().await.or_bad_request()?;
                    if !file_name.is_empty() && !data.is_empty() {
                        form.files.insert(name, UploadedFile { file_name, data });
                    }
                }
                None => {
                    let value = field.text().await.or_bad_request()?;
                    form.fields.insert(name, value);
                }
            }
        }
        Ok(form)
    }

    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }

    /// Trimmed text field; blank values count as absent.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Parse a numeric field, 400 when it is not a number.
    pub fn parse_field<T: std::str::FromStr>(&self, name: &str) -> RouteResult<Option<T>> {
        self.field(name)
            .map(|v| {
                v.parse().map_err(|_| {
                    (StatusCode::BAD_REQUEST, format!("Invalid value for {name}: {v}"))
                })
            })
            .transpose()
    }

    /// Checkbox-style flag: absent means `default`.
    pub fn flag(&self, name: &str, default: bool) -> bool {
        self.field(name).map_or(default, |v| {
            matches!(v.to_ascii_lowercase().as_str(), "on" | "true" | "1" | "yes")
        })
    }
}

/// Validate a client-supplied file name, 400 if it could leave its directory.
pub fn checked_file_name(name: &str) -> RouteResult<&str> {
    safe_file_name(name).ok_or_else(|| (StatusCode::BAD_REQUEST, format!("Invalid file name: {name}")))
}

/// Serve a file from disk as an attachment.
pub async fn attachment(path: &Path, download_name: &str) -> RouteResult<Response> {
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err((StatusCode::NOT_FOUND, "File not found".to_string()));
        }
        Err(e) => return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    };

    let content_type = mime_guess::from_path(download_name).first_or_octet_stream();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{download_name}\""),
        )
        .body(Body::from(data))
        .or_internal_error()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_form_fields() {
        let mut form = UploadForm::default();
        form.fields.insert("group_size".into(), " 4 ".into());
        form.fields.insert("post_edit".into(), "off".into());
        form.fields.insert("blank".into(), "  ".into());

        assert_eq!(form.parse_field::<usize>("group_size"), Ok(Some(4)));
        assert_eq!(form.parse_field::<usize>("missing"), Ok(None));
        assert!(!form.flag("post_edit", true));
        assert!(form.flag("missing", true));
        assert_eq!(form.field("blank"), None);
    }

    #[test]
    fn test_bad_number_is_rejected() {
        let mut form = UploadForm::default();
        form.fields.insert("group_size".into(), "three".into());
        let (status, msg) = form.parse_field::<usize>("group_size").unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(msg.contains("group_size"));
    }

    #[test]
    fn test_checked_file_name() {
        assert_eq!(checked_file_name("out.docx"), Ok("out.docx"));
        assert_eq!(checked_file_name("../etc/passwd").unwrap_err().0, StatusCode::BAD_REQUEST);
    }
}
