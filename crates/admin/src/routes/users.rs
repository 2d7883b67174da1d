//! Users and roles.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use tracing::instrument;

use mytechgear_core::{UserId, UserRole};

use crate::db::UserRepository;
use crate::db::users::UserListItem;
use crate::error::{AppError, Result};
use crate::middleware::Staff;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SetRole {
    pub role: UserRole,
}

/// An admin may not remove their own admin role.
///
/// # Errors
///
/// Returns `AppError::Forbidden` for a self-demotion.
pub fn check_role_change(actor: UserId, target: UserId, role: UserRole) -> Result<()> {
    if actor == target && !role.is_admin() {
        return Err(AppError::Forbidden(
            "you cannot remove your own admin role".to_string(),
        ));
    }
    Ok(())
}

/// `GET /admin/users`
#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<UserListItem>>> {
    Ok(Json(UserRepository::new(state.pool()).list().await?))
}

/// `PUT /admin/users/{id}/role`
#[instrument(skip(state, staff), fields(actor = %staff.id))]
pub async fn set_role(
    State(state): State<AppState>,
    Staff(staff): Staff,
    Path(id): Path<UserId>,
    Json(request): Json<SetRole>,
) -> Result<StatusCode> {
    check_role_change(staff.id, id, request.role)?;
    UserRepository::new(state.pool())
        .set_role(id, request.role)
        .await?;
    tracing::info!(user_id = %id, role = %request.role, "Role changed");
    Ok(StatusCode::NO_CONTENT)
}
