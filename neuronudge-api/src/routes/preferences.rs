/// Preference endpoints
///
/// - `GET /v1/preferences` - Saved values, or defaults if never saved
/// - `PUT /v1/preferences` - Replace all values (created on first save)
///
/// `focus_minutes` also sets how far ahead a task without a due date is due.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Extension, Json};
use neuronudge_shared::{
    auth::middleware::AuthContext,
    models::preferences::{PreferenceValues, Preferences},
};
use validator::Validate;

pub async fn get_preferences(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<PreferenceValues>> {
    let values = Preferences::values_for_user(&state.db, auth.user_id).await?;
    Ok(Json(values))
}

/// # Errors
///
/// - `422 Unprocessable Entity`: A duration is out of range or the font size
///   is not small, medium or large
pub async fn update_preferences(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(values): Json<PreferenceValues>,
) -> ApiResult<Json<PreferenceValues>> {
    values.validate()?;

    let saved = Preferences::upsert(&state.db, auth.user_id, &values).await?;
    state.audit(auth.user_id, "Updated onboarding preferences").await;

    Ok(Json(saved.values))
}
