//! Account route handlers: profile and order history.

use axum::{Json, extract::State};
use serde::Serialize;
use tracing::instrument;

use mytechgear_core::Email;
use mytechgear_core::order::OrderSummary;

use crate::db::{OrderRepository, ProfileRepository};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{Profile, ProfileUpdate};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub email: Email,
    #[serde(flatten)]
    pub profile: Profile,
}

/// `GET /api/account/profile`
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<ProfileResponse>> {
    let profile = ProfileRepository::new(state.pool()).get(user.id).await?;
    Ok(Json(ProfileResponse {
        email: user.email,
        profile,
    }))
}

/// `PUT /api/account/profile`
///
/// Two sequential writes: contact fields, then the default address. The
/// address is only written once the contact step has succeeded.
#[instrument(skip(state, update), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<ProfileResponse>> {
    let update = update.normalize().map_err(AppError::Validation)?;
    let profiles = ProfileRepository::new(state.pool());

    profiles
        .update_contact(
            user.id,
            update.first_name.as_deref(),
            update.last_name.as_deref(),
            update.phone.as_deref(),
        )
        .await?;
    profiles
        .update_default_address(user.id, update.default_address.as_ref())
        .await?;

    let profile = profiles.get(user.id).await?;
    Ok(Json(ProfileResponse {
        email: user.email,
        profile,
    }))
}

#[derive(Debug, Serialize)]
pub struct OrderListItem {
    #[serde(flatten)]
    pub summary: OrderSummary,
    pub formatted_total: String,
}

/// `GET /api/account/orders`, newest first.
#[instrument(skip(state), fields(user_id = %user.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<Json<Vec<OrderListItem>>> {
    let pool = state.pool();
    let user_id = user.id;
    let orders = state
        .order_lists()
        .get_or_load(user_id, move || async move {
            OrderRepository::new(pool).list_for_user(user_id).await
        })
        .await?;

    let currency = state.config().currency;
    Ok(Json(
        orders
            .iter()
            .map(|summary| OrderListItem {
                formatted_total: currency.format(summary.total_amount),
                summary: summary.clone(),
            })
            .collect(),
    ))
}
