//! Object storage for uploaded images.
//!
//! Objects live in named buckets on an HTTP object-storage service; the
//! database only keeps their path and public URL. Everything above this
//! module talks to [`ObjectStorage`], so tests can swap in an in-memory
//! implementation.

pub mod client;

use std::future::Future;

use axum::body::Bytes;
use thiserror::Error;

use mytechgear_core::media::Bucket;

pub use client::StorageClient;

/// Errors that can occur when talking to object storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// HTTP request failed before a response arrived.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("storage returned {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The object does not exist.
    #[error("object not found: {0}")]
    NotFound(String),

    /// The service key was refused.
    #[error("storage credentials rejected")]
    Unauthorized,
}

/// Upload, address and delete objects in buckets.
pub trait ObjectStorage: Send + Sync {
    /// Store `body` at `path` in `bucket`. Existing objects are not overwritten.
    fn upload(
        &self,
        bucket: Bucket,
        path: &str,
        content_type: &str,
        body: Bytes,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Public URL under which browsers can fetch an object.
    fn public_url(&self, bucket: Bucket, path: &str) -> String;

    /// Delete an object.
    fn remove(
        &self,
        bucket: Bucket,
        path: &str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = StorageError::Rejected {
            status: 413,
            message: "Payload too large".to_string(),
        };
        assert_eq!(err.to_string(), "storage returned 413: Payload too large");
        assert_eq!(
            StorageError::NotFound("p1/main.webp".to_string()).to_string(),
            "object not found: p1/main.webp"
        );
    }
}
