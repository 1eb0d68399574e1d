//! Per-request upload buffer backed by a temporary file.
//!
//! The file lives exactly as long as the `ScopedUpload` value: dropping it (on any
//! exit path of the request) deletes the file.

use std::path::Path;

use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::errors::AppError;

#[derive(Debug)]
pub struct ScopedUpload {
    file: NamedTempFile,
    len: usize,
    content_type: Option<String>,
}

impl ScopedUpload {
    /// Streams a multipart field into a fresh temp file, enforcing `max_bytes`.
    pub async fn from_field(mut field: Field<'_>, max_bytes: usize) -> Result<Self, AppError> {
        let content_type = field.content_type().map(str::to_string);
        let mut upload = Self::empty(content_type)?;
        let mut writer = upload.async_writer()?;

        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| multipart_error("failed to read image upload", e))?
        {
            upload.len += chunk.len();
            if upload.len > max_bytes {
                return Err(AppError::PayloadTooLarge(format!(
                    "image upload exceeds the {max_bytes} byte limit"
                )));
            }
            writer.write_all(&chunk).await.map_err(buffer_error)?;
        }
        writer.flush().await.map_err(buffer_error)?;

        debug!(bytes = upload.len, path = %upload.path().display(), "buffered image upload");
        Ok(upload)
    }

    /// Buffers bytes that are already in memory.
    #[cfg(test)]
    pub async fn from_bytes(bytes: &[u8], content_type: Option<String>) -> Result<Self, AppError> {
        let mut upload = Self::empty(content_type)?;
        let mut writer = upload.async_writer()?;
        writer.write_all(bytes).await.map_err(buffer_error)?;
        writer.flush().await.map_err(buffer_error)?;
        upload.len = bytes.len();
        Ok(upload)
    }

    fn empty(content_type: Option<String>) -> Result<Self, AppError> {
        let file = tempfile::Builder::new()
            .prefix("iris-upload-")
            .tempfile()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to create temp file: {e}")))?;
        Ok(Self {
            file,
            len: 0,
            content_type,
        })
    }

    fn async_writer(&self) -> Result<tokio::fs::File, AppError> {
        let handle = self
            .file
            .reopen()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to open temp file: {e}")))?;
        Ok(tokio::fs::File::from_std(handle))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Reads the buffered upload back into memory.
    pub async fn read_all(&self) -> Result<Vec<u8>, AppError> {
        tokio::fs::read(self.path())
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to read buffered upload: {e}")))
    }
}

/// Maps a multipart read failure, keeping body-limit rejections distinct from malformed forms.
pub fn multipart_error(context: &str, e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(format!("{context}: {}", e.body_text()))
    } else {
        AppError::InvalidInput(format!("{context}: {}", e.body_text()))
    }
}

fn buffer_error(e: std::io::Error) -> AppError {
    AppError::Internal(anyhow::anyhow!("failed to buffer upload: {e}"))
}

impl Drop for ScopedUpload {
    fn drop(&mut self) {
        debug!(path = %self.file.path().display(), "releasing image upload");
    }
}
