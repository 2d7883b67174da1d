//! Store settings.

use axum::{Json, extract::State};
use tracing::instrument;

use crate::db::settings;
use crate::error::{AppError, Result};
use crate::models::{StoreSettings, StoreSettingsUpdate};
use crate::state::AppState;

/// `GET /admin/settings`
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>) -> Result<Json<StoreSettings>> {
    let rows = settings::get_all(state.pool()).await?;
    Ok(Json(StoreSettings::from_rows(&rows)))
}

/// `PUT /admin/settings`
///
/// Absent fields are left as they are. Returns the settings after the edit.
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    Json(update): Json<StoreSettingsUpdate>,
) -> Result<Json<StoreSettings>> {
    let rows = update.into_rows().map_err(AppError::Validation)?;
    if !rows.is_empty() {
        settings::set_many(state.pool(), &rows).await?;
        tracing::info!(keys = ?rows.iter().map(|(k, _)| *k).collect::<Vec<_>>(), "Settings updated");
    }
    let rows = settings::get_all(state.pool()).await?;
    Ok(Json(StoreSettings::from_rows(&rows)))
}
