//! Staff sign-in pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::{clear_current_staff, set_current_staff};
use crate::services::{AuthError, AuthService};
use crate::state::AppState;

/// Sign-in form page.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginPage {
    pub email: String,
    pub error: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// `GET /auth/login`
pub async fn login_page() -> LoginPage {
    LoginPage {
        email: String::new(),
        error: None,
    }
}

/// `POST /auth/login`
///
/// Any account can sign in; the `/admin` gate decides what it may see.
#[instrument(skip(state, session, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    match AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
    {
        Ok(staff) => {
            set_current_staff(&session, &staff).await?;
            Ok(Redirect::to("/admin").into_response())
        }
        Err(AuthError::InvalidCredentials) => {
            tracing::warn!("Staff login failed");
            let page = LoginPage {
                email: form.email,
                error: Some("Invalid email or password".to_string()),
            };
            Ok((StatusCode::UNAUTHORIZED, page).into_response())
        }
        Err(e) => Err(AppError::Auth(e)),
    }
}

/// `POST /auth/logout`
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_current_staff(&session).await?;
    Ok(Redirect::to("/auth/login"))
}
