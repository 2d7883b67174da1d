//! Unified error handling for the back office.
//!
//! JSON handlers return `Result<T, AppError>`. Server-side failures go to
//! Sentry before responding, and their details never reach the client.

use std::any::Any;

use askama::Template;
use axum::{
    Json,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use mytechgear_core::media::UploadRejection;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::images::ImageError;

/// Application-level error type for the back office.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Image operation failed.
    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    /// Staff login failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Well-formed request with invalid field values.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Action not allowed for this admin.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    const fn is_server_error(&self) -> bool {
        match self {
            Self::Database(err) => !matches!(
                err,
                RepositoryError::NotFound | RepositoryError::Conflict(_)
            ),
            Self::Image(err) => matches!(
                err,
                ImageError::Upload(_) | ImageError::StorageRemove { .. } | ImageError::Reorder { .. }
            ),
            Self::Auth(err) => matches!(err, AuthError::Repository(_)),
            Self::Session(_) | Self::Internal(_) => true,
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Database(err) | Self::Image(ImageError::Repository(err)) => match err {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Image(err) => match err {
                ImageError::Rejected(UploadRejection::TooLarge { .. }) => {
                    StatusCode::PAYLOAD_TOO_LARGE
                }
                ImageError::Rejected(UploadRejection::UnsupportedType(_)) => {
                    StatusCode::UNSUPPORTED_MEDIA_TYPE
                }
                ImageError::Rejected(UploadRejection::Empty) => StatusCode::BAD_REQUEST,
                ImageError::NotFound => StatusCode::NOT_FOUND,
                ImageError::AtEdge => StatusCode::CONFLICT,
                ImageError::Upload(_) | ImageError::StorageRemove { .. } => StatusCode::BAD_GATEWAY,
                ImageError::Reorder { .. } | ImageError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Auth(AuthError::InvalidCredentials) => StatusCode::UNAUTHORIZED,
            Self::Auth(AuthError::Repository(_)) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
        }
    }

    /// Machine-readable error code for the JSON body.
    const fn code(&self) -> &'static str {
        match self {
            Self::Database(RepositoryError::NotFound)
            | Self::Image(ImageError::NotFound | ImageError::Repository(RepositoryError::NotFound))
            | Self::NotFound(_) => "not_found",
            Self::Database(RepositoryError::Conflict(_)) => "conflict",
            Self::Image(ImageError::Rejected(_)) => "upload_rejected",
            Self::Image(ImageError::AtEdge) => "cannot_move",
            Self::Image(ImageError::Upload(_)) => "storage_upload_failed",
            Self::Image(ImageError::StorageRemove { .. }) => "storage_delete_failed",
            Self::Image(ImageError::Reorder { .. }) => "reorder_failed",
            Self::Auth(AuthError::InvalidCredentials) => "unauthorized",
            Self::BadRequest(_) => "bad_request",
            Self::Validation(_) => "validation",
            Self::Forbidden(_) => "forbidden",
            _ => "internal",
        }
    }

    /// Client-safe message.
    fn message(&self) -> String {
        match self {
            Self::Database(RepositoryError::Conflict(msg)) => msg.clone(),
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::Image(err) => match err {
                ImageError::Rejected(rejection) => rejection.to_string(),
                ImageError::NotFound | ImageError::Repository(RepositoryError::NotFound) => {
                    "Not found".to_string()
                }
                ImageError::AtEdge => err.to_string(),
                ImageError::Upload(_) => "The image could not be uploaded".to_string(),
                ImageError::StorageRemove { .. } => {
                    "The image file could not be deleted from storage, so the image was kept. Try again."
                        .to_string()
                }
                ImageError::Reorder { restored: true, .. } => {
                    "The images could not be reordered; their order is unchanged".to_string()
                }
                ImageError::Reorder { restored: false, .. } => {
                    "The images could not be reordered and their order may be inconsistent. Reload before trying again."
                        .to_string()
                }
                ImageError::Repository(_) => "Internal server error".to_string(),
            },
            Self::Auth(AuthError::InvalidCredentials) => "Invalid credentials".to_string(),
            Self::BadRequest(msg) | Self::Validation(msg) | Self::Forbidden(msg) => msg.clone(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        let mut body = json!({
            "error": self.code(),
            "message": self.message(),
        });
        if let Self::Image(ImageError::Reorder { restored, .. }) = &self {
            body["restored"] = json!(restored);
        }

        (self.status(), Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

// =============================================================================
// Panic fallback page
// =============================================================================

#[derive(Template)]
#[template(path = "error.html")]
struct PanicPage<'a> {
    reference: Option<String>,
    reload_href: &'a str,
}

/// Full-page fallback rendered when a handler panics.
///
/// Used with `tower_http::catch_panic::CatchPanicLayer::custom`.
#[must_use]
pub fn panic_fallback(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    let event_id = sentry::capture_message(detail, sentry::Level::Fatal);
    tracing::error!(panic = %detail, sentry_event_id = %event_id, "Handler panicked");

    let page = PanicPage {
        reference: Some(event_id.to_string()),
        reload_href: "/admin",
    };
    let html = page.render().unwrap_or_else(|_| {
        "<h1>Something went wrong</h1><a href=\"/admin\">Reload</a>".to_string()
    });

    (StatusCode::INTERNAL_SERVER_ERROR, Html(html)).into_response()
}

#[cfg(test)]
mod tests {
    use mytechgear_core::ImageId;

    use super::*;

    #[test]
    fn test_upload_rejections_map_to_client_errors() {
        let too_large = AppError::Image(ImageError::Rejected(UploadRejection::TooLarge {
            size: 6 * 1024 * 1024,
            max: 5 * 1024 * 1024,
        }));
        assert_eq!(too_large.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(too_large.code(), "upload_rejected");
        assert!(!too_large.is_server_error());

        let wrong_type = AppError::Image(ImageError::Rejected(UploadRejection::UnsupportedType(
            "image/svg+xml".to_string(),
        )));
        assert_eq!(wrong_type.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn test_storage_delete_failure_is_reported() {
        let err = AppError::Image(ImageError::StorageRemove {
            path: format!("{}/main.webp", ImageId::random()),
            source: crate::storage::StorageError::Unauthorized,
        });
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.code(), "storage_delete_failed");
        assert!(err.message().contains("kept"));
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = AppError::Database(RepositoryError::DataCorruption(
            "products.specifications: expected object".to_string(),
        ));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "Internal server error");

        let conflict = AppError::Database(RepositoryError::Conflict(
            "a product with this slug already exists".to_string(),
        ));
        assert_eq!(conflict.status(), StatusCode::CONFLICT);
        assert_eq!(conflict.message(), "a product with this slug already exists");
    }
}
