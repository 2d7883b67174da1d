//! The `/admin` role gate.
//!
//! [`require_admin`] runs on every gated request: it reads the signed-in
//! identity from the session, looks up the role through a [`RoleSource`],
//! and drives the [`AccessGate`](mytechgear_core::access::AccessGate) to a
//! final state. Only [`GateState::Authorized`] reaches the handler; every
//! other state gets its own response, so gated content is never rendered
//! while the check is still open.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{Method, StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use mytechgear_core::access::GateState;

use crate::models::{CurrentStaff, session_keys};
use crate::services::gate::{RoleSource, check_access};

/// Shown to signed-in users without the admin role.
#[derive(Template, WebTemplate)]
#[template(path = "gate/forbidden.html")]
pub struct ForbiddenPage {
    pub email: String,
}

/// Shown when the role could not be looked up.
#[derive(Template, WebTemplate)]
#[template(path = "gate/error.html")]
pub struct GateErrorPage {
    pub retry_href: String,
}

fn unauthenticated(method: &Method) -> Response {
    if method == Method::GET || method == Method::HEAD {
        Redirect::to("/auth/login").into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "unauthorized",
                "message": "Sign in to continue",
            })),
        )
            .into_response()
    }
}

fn gate_error(request: &Request) -> Response {
    let retry_href = request
        .uri()
        .path_and_query()
        .map_or_else(|| "/admin".to_string(), ToString::to_string);
    (
        StatusCode::SERVICE_UNAVAILABLE,
        GateErrorPage { retry_href },
    )
        .into_response()
}

/// Let only admins through.
///
/// - nobody signed in: redirect to `/auth/login` (401 for non-GET requests)
/// - signed in without the admin role: 403 page
/// - role lookup failed: 503 page with a retry link back to the same URL
///
/// Authorized requests carry the [`CurrentStaff`] in their extensions.
pub async fn require_admin<R: RoleSource>(
    State(roles): State<R>,
    session: Session,
    mut request: Request,
    next: Next,
) -> Response {
    let staff = match session.get::<CurrentStaff>(session_keys::CURRENT_STAFF).await {
        Ok(staff) => staff,
        Err(e) => {
            tracing::warn!(error = %e, "Session lookup failed");
            return gate_error(&request);
        }
    };

    let gate = check_access(&roles, staff.as_ref().map(|s| s.id)).await;

    match (gate.state(), staff) {
        (GateState::Authorized, Some(staff)) => {
            sentry::configure_scope(|scope| {
                scope.set_user(Some(sentry::User {
                    id: Some(staff.id.to_string()),
                    email: Some(staff.email.to_string()),
                    ..Default::default()
                }));
            });
            request.extensions_mut().insert(staff);
            next.run(request).await
        }
        (GateState::Forbidden, Some(staff)) => {
            tracing::info!(user_id = %staff.id, path = %request.uri().path(), "Back office access denied");
            (
                StatusCode::FORBIDDEN,
                ForbiddenPage {
                    email: staff.email.to_string(),
                },
            )
                .into_response()
        }
        (GateState::Unauthenticated, _) => unauthenticated(request.method()),
        (state, _) => {
            tracing::warn!(?state, error = gate.error().unwrap_or_default(), "Role lookup failed");
            gate_error(&request)
        }
    }
}

/// The admin who passed the gate.
///
/// Only available on routes behind [`require_admin`].
pub struct Staff(pub CurrentStaff);

impl<S> FromRequestParts<S> for Staff
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentStaff>()
            .cloned()
            .map(Self)
            .ok_or_else(|| unauthenticated(&parts.method))
    }
}

/// Store the signed-in identity in the session.
///
/// The session ID is cycled first so a pre-login session cannot be fixated.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_staff(
    session: &Session,
    staff: &CurrentStaff,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_STAFF, staff).await
}

/// Drop the whole session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be deleted.
pub async fn clear_current_staff(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
