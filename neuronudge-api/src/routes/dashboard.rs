/// Dashboard endpoint
///
/// # Endpoint
///
/// ```text
/// GET /v1/dashboard?status=pending&priority=1&search=rent&page=2
/// ```
///
/// All parameters are optional. Unknown `status`/`priority` values and a
/// malformed `page` fall back to their defaults instead of failing.
///
/// # Response
///
/// ```json
/// {
///   "template": "dashboard_adhd",
///   "widgets": ["task_timer", "focus_mode"],
///   "counts": { "total": 12, "pending": 9, "completed": 3, "overdue": 2 },
///   "filter": { "status": "pending", "priority": 1, "search": "rent" },
///   "tasks": { "items": [...], "page": 2, "per_page": 10, "total_items": 14, ... },
///   "preferences": { "focus_minutes": 25, ... }
/// }
/// ```

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::tasks::TaskResponse,
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use neuronudge_shared::{
    auth::middleware::AuthContext,
    dashboard::{aggregate, DashboardFilter, Page, PageRequest, TaskCounts},
    models::{
        preferences::{PreferenceValues, Preferences},
        task::Task,
        user::{User, Widget},
    },
};
use serde::{Deserialize, Serialize};

/// Raw query parameters
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
}

impl DashboardQuery {
    pub fn filter(&self) -> DashboardFilter {
        DashboardFilter::from_params(
            self.status.as_deref(),
            self.priority.as_deref(),
            self.search.as_deref(),
        )
    }

    pub fn page_request(&self, per_page: u32) -> PageRequest {
        let page = self.page.as_deref().and_then(|p| p.trim().parse().ok());
        PageRequest::new(page, per_page)
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    /// Dashboard template the client should render
    pub template: &'static str,
    pub widgets: Vec<Widget>,
    pub counts: TaskCounts,
    pub filter: DashboardFilter,
    pub tasks: Page<TaskResponse>,
    pub preferences: PreferenceValues,
}

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Json<DashboardResponse>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let tasks = Task::list_by_user(&state.db, auth.user_id).await?;
    let preferences = Preferences::values_for_user(&state.db, auth.user_id).await?;

    let now = state.now().naive_utc();
    let filter = query.filter();
    let page = query.page_request(state.config.tasks.dashboard_page_size);

    let view = aggregate(tasks, &filter, page, now);

    tracing::debug!(
        user_id = %auth.user_id,
        total = view.counts.total,
        shown = view.tasks.items.len(),
        "Dashboard aggregated"
    );

    Ok(Json(DashboardResponse {
        template: user.dashboard_template(),
        widgets: user.features.widgets(),
        counts: view.counts,
        filter: view.filter,
        tasks: view
            .tasks
            .map(|task| TaskResponse::new(task, &state.normalizer, now)),
        preferences,
    }))
}
