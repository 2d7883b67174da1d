//! Unified error handling with Sentry integration.
//!
//! Handlers return `Result<T, AppError>`. Server-side failures are captured
//! to Sentry before responding; clients get a JSON body
//! `{"error": <code>, "message": <text>}` with internal details hidden.

use std::any::Any;

use askama::Template;
use axum::{
    Json,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use mytechgear_core::cart::CartError;
use mytechgear_core::order::OrderDraftError;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::checkout::CheckoutError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Cart mutation rejected.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Well-formed request with invalid field values.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this is a server-side failure worth a Sentry event.
    const fn is_server_error(&self) -> bool {
        match self {
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => true,
            Self::Auth(err) => matches!(err, AuthError::Repository(_) | AuthError::PasswordHash),
            Self::Checkout(err) => matches!(
                err,
                CheckoutError::Backend(_)
                    | CheckoutError::ItemsFailed { .. }
                    | CheckoutError::ItemsRejected { .. }
            ),
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Database(RepositoryError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => StatusCode::UNAUTHORIZED,
                AuthError::EmailTaken => StatusCode::CONFLICT,
                AuthError::InvalidPassword(_) | AuthError::InvalidEmail(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Checkout(err) => match err {
                CheckoutError::Invalid(OrderDraftError::EmptyCart) => StatusCode::BAD_REQUEST,
                CheckoutError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CheckoutError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
                CheckoutError::Unavailable(_)
                | CheckoutError::ItemsFailed { .. }
                | CheckoutError::ItemsRejected { .. }
                | CheckoutError::AlreadyPending(_) => StatusCode::CONFLICT,
                CheckoutError::NothingPending => StatusCode::NOT_FOUND,
            },
            Self::Cart(err) => match err {
                CartError::UnknownLine(_) => StatusCode::NOT_FOUND,
                CartError::OutOfStock(_) => StatusCode::CONFLICT,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            },
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Machine-readable error code for the JSON body.
    const fn code(&self) -> &'static str {
        match self {
            Self::Database(RepositoryError::NotFound) | Self::NotFound(_) => "not_found",
            Self::Database(RepositoryError::Conflict(_)) => "conflict",
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => "internal",
            Self::Auth(AuthError::InvalidCredentials | AuthError::UserNotFound)
            | Self::Unauthorized(_) => "unauthorized",
            Self::Auth(AuthError::EmailTaken) => "conflict",
            Self::Auth(AuthError::InvalidPassword(_) | AuthError::InvalidEmail(_))
            | Self::Validation(_) => "validation",
            Self::Auth(_) => "internal",
            Self::Checkout(CheckoutError::ItemsFailed { .. }) => "order_items_pending",
            Self::Checkout(CheckoutError::ItemsRejected { .. }) => "order_items_rejected",
            Self::Checkout(CheckoutError::Unavailable(_)) => "items_unavailable",
            Self::Checkout(CheckoutError::AlreadyPending(_)) => "checkout_pending",
            Self::Checkout(CheckoutError::NothingPending) => "nothing_pending",
            Self::Checkout(CheckoutError::Backend(_)) => "internal",
            Self::Checkout(CheckoutError::Invalid(_)) | Self::Cart(_) | Self::BadRequest(_) => {
                "bad_request"
            }
            Self::RateLimited => "rate_limited",
        }
    }

    /// Client-safe message.
    fn message(&self) -> String {
        match self {
            Self::Database(RepositoryError::NotFound) => "Not found".to_string(),
            Self::Database(RepositoryError::Conflict(msg)) => msg.clone(),
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                "Internal server error".to_string()
            }
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => {
                    "Invalid credentials".to_string()
                }
                AuthError::EmailTaken => {
                    "An account with this email already exists".to_string()
                }
                AuthError::InvalidPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    "Authentication error".to_string()
                }
            },
            Self::Checkout(err) => match err {
                CheckoutError::Backend(_) => "Your order could not be placed".to_string(),
                CheckoutError::ItemsFailed { pending, .. } => format!(
                    "Order {} was created but its items could not be saved. Retry to finish it.",
                    pending.order.order_number
                ),
                CheckoutError::ItemsRejected { order, .. } => format!(
                    "Order {} could not be completed and was not charged. Check your cart and try again.",
                    order.order_number
                ),
                CheckoutError::Unavailable(names) => format!(
                    "No longer available: {}. Remove them from your cart to continue.",
                    names.join(", ")
                ),
                other => other.to_string(),
            },
            Self::Cart(err) => err.to_string(),
            Self::NotFound(what) => format!("Not found: {what}"),
            Self::Unauthorized(msg) | Self::BadRequest(msg) | Self::Validation(msg) => msg.clone(),
            Self::RateLimited => "Too many requests".to_string(),
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
                "Request error"
            );
        }

        let mut body = json!({
            "error": self.code(),
            "message": self.message(),
        });

        // The order reference must reach the client so the item step can be retried.
        match &self {
            Self::Checkout(CheckoutError::ItemsFailed { pending, .. }) => {
                body["order_id"] = json!(pending.order.id);
                body["order_number"] = json!(pending.order.order_number);
                body["retryable"] = json!(true);
            }
            Self::Checkout(CheckoutError::AlreadyPending(order)) => {
                body["order_id"] = json!(order.id);
                body["order_number"] = json!(order.order_number);
                body["retryable"] = json!(true);
            }
            Self::Checkout(CheckoutError::ItemsRejected { order, cancelled, .. }) => {
                body["order_id"] = json!(order.id);
                body["order_number"] = json!(order.order_number);
                body["cancelled"] = json!(cancelled);
                body["retryable"] = json!(false);
            }
            Self::Checkout(CheckoutError::Unavailable(names)) => {
                body["items"] = json!(names);
                body["retryable"] = json!(false);
            }
            _ => {}
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
    store_name: &'a str,
    request_id: Option<String>,
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
        store_name: "MyTechGear",
        request_id: Some(event_id.to_string()),
        reload_href: "/",
    };
    let html = page
        .render()
        .unwrap_or_else(|_| "<h1>Something went wrong</h1><a href=\"/\">Reload</a>".to_string());

    (StatusCode::INTERNAL_SERVER_ERROR, Html(html)).into_response()
}

// =============================================================================
// Sentry helpers
// =============================================================================

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("key", &line.key())]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use mytechgear_core::order::{NewOrderItem, OrderRef};
    use mytechgear_core::{Cents, OrderId, ProductId, UserId};

    use super::*;
    use crate::services::checkout::PendingCheckout;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Validation("test".to_string())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(AppError::Auth(AuthError::EmailTaken)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Cart(CartError::ZeroQuantity)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::Invalid(
                OrderDraftError::EmptyCart
            ))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let response =
            AppError::Internal("connection string postgres://secret".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Internal server error");
        assert_eq!(body["error"], "internal");
    }

    #[tokio::test]
    async fn test_items_failed_is_distinguishable_and_retryable() {
        let order = OrderRef {
            id: OrderId::random(),
            order_number: "MTG-20260101-00042".to_string(),
        };
        let pending = PendingCheckout {
            user_id: UserId::random(),
            order: order.clone(),
            items: vec![NewOrderItem {
                product_id: ProductId::random(),
                variant_id: None,
                product_name: "Falcon".to_string(),
                variant_name: None,
                unit_price: Cents::new(24_900),
                quantity: 1,
                total_price: Cents::new(24_900),
            }],
        };
        let err = AppError::Checkout(CheckoutError::ItemsFailed {
            pending: Box::new(pending),
            source: RepositoryError::Database(sqlx::Error::PoolTimedOut),
        });

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["error"], "order_items_pending");
        assert_eq!(body["order_number"], "MTG-20260101-00042");
        assert_eq!(body["order_id"], json!(order.id));
        assert_eq!(body["retryable"], true);
    }

    #[tokio::test]
    async fn test_rejected_items_are_not_retryable() {
        let order = OrderRef {
            id: OrderId::random(),
            order_number: "MTG-20260101-00043".to_string(),
        };
        let err = AppError::Checkout(CheckoutError::ItemsRejected {
            order: order.clone(),
            cancelled: true,
            source: RepositoryError::Conflict("order_items_product_id_fkey".to_string()),
        });

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["error"], "order_items_rejected");
        assert_eq!(body["order_id"], json!(order.id));
        assert_eq!(body["cancelled"], true);
        assert_eq!(body["retryable"], false);
    }

    #[tokio::test]
    async fn test_unavailable_lines_are_named() {
        let err = AppError::Checkout(CheckoutError::Unavailable(vec![
            "Falcon – Noir".to_string(),
        ]));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["error"], "items_unavailable");
        assert_eq!(body["items"], json!(["Falcon – Noir"]));
        assert_eq!(body["retryable"], false);
    }

    #[tokio::test]
    async fn test_panic_fallback_renders_reload_page() {
        let response = panic_fallback(Box::new("kaboom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let html = String::from_utf8(bytes.to_vec()).expect("utf8");
        assert!(html.contains("Reload"));
        assert!(!html.contains("kaboom"));
    }
}
