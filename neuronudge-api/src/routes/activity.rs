/// Recent activity endpoint
///
/// ```text
/// GET /v1/activity?limit=20
/// ```
///
/// Newest first. `limit` defaults to 20 and is clamped to 1..=100.

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use neuronudge_shared::{auth::middleware::AuthContext, models::activity_log::ActivityLog};
use serde::Deserialize;

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<i64>,
}

impl ActivityQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

pub async fn list_activity(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ActivityQuery>,
) -> ApiResult<Json<Vec<ActivityLog>>> {
    let entries = ActivityLog::list_recent(&state.db, auth.user_id, query.limit()).await?;
    Ok(Json(entries))
}
