/// Task endpoints
///
/// Every handler that takes a task ID loads the row and runs the ownership
/// check before reading or changing it: a missing task is `404`, another
/// user's task is `403`.
///
/// # Endpoints
///
/// - `GET    /v1/tasks` - All tasks in dashboard order
/// - `POST   /v1/tasks` - Create a task
/// - `GET    /v1/tasks/:id` - One task
/// - `PUT    /v1/tasks/:id` - Replace a task's editable fields
/// - `DELETE /v1/tasks/:id` - Delete a task
/// - `POST   /v1/tasks/:id/complete` - Toggle completion
/// - `POST   /v1/tasks/:id/reminder` - Toggle the reminder flag
/// - `POST   /v1/tasks/bulk-complete` - Complete several tasks
/// - `POST   /v1/tasks/bulk-delete` - Delete several tasks
/// - `POST   /v1/tasks/search` - Advanced search
/// - `GET    /v1/tasks/export` - JSON export

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use neuronudge_shared::{
    auth::{authorization::require_task_access, middleware::AuthContext},
    dashboard::sort_tasks,
    due_date::DueDateNormalizer,
    models::{
        preferences::Preferences,
        task::{CreateTask, Priority, Task, TaskSearch, TaskStatus, UpdateTask},
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Task as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct TaskResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,

    /// Derived from `status`
    pub completed: bool,

    pub priority: i32,
    pub reminder_set: bool,

    /// Stored due timestamp (naive UTC)
    pub due_date: Option<NaiveDateTime>,

    /// Due timestamp in the reference timezone
    pub due_local: Option<DateTime<FixedOffset>>,

    /// Calendar due date in the reference timezone
    pub due_day: Option<NaiveDate>,

    pub overdue: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskResponse {
    pub fn new(task: Task, normalizer: &DueDateNormalizer, now: NaiveDateTime) -> Self {
        Self {
            completed: task.completed(),
            overdue: task.is_overdue(now),
            due_local: task.due_date.map(|d| normalizer.to_local(d)),
            due_day: task.due_date.map(|d| normalizer.local_date(d)),
            id: task.id,
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            reminder_set: task.reminder_set,
            due_date: task.due_date,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

/// Priority as submitted: `1`, `"1"`, or `"all"` where a filter allows it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PriorityInput {
    Number(i32),
    Text(String),
}

impl PriorityInput {
    pub fn to_priority(&self) -> Option<Priority> {
        match self {
            PriorityInput::Number(n) => Priority::from_i32(*n),
            PriorityInput::Text(s) => Priority::parse(s),
        }
    }
}

/// Create/update request
#[derive(Debug, Deserialize, Validate)]
pub struct TaskRequest {
    #[validate(length(min = 1, max = 100, message = "Title must be 1-100 characters"))]
    pub title: String,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    /// Calendar date in the reference timezone; omitted means "one focus
    /// session from now"
    pub due_date: Option<NaiveDate>,

    pub status: Option<TaskStatus>,

    /// Legacy completion flag, reconciled with `status`
    pub completed: Option<bool>,

    /// 1 (high) to 3 (low)
    pub priority: Option<PriorityInput>,

    pub reminder_set: Option<bool>,
}

/// Request fields after validation, ready to store
#[derive(Debug, Clone, PartialEq)]
struct TaskFields {
    title: String,
    description: Option<String>,
    due_date: Option<NaiveDateTime>,
    status: TaskStatus,
    priority: Priority,
    reminder_set: bool,
}

impl TaskRequest {
    /// Validates the request and resolves it against the current task, if any
    fn into_fields(
        self,
        current: Option<&Task>,
        normalizer: &DueDateNormalizer,
        focus_minutes: Option<i32>,
        now: DateTime<Utc>,
    ) -> ApiResult<TaskFields> {
        self.validate()?;

        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(ApiError::invalid("title", "Title is required"));
        }

        let priority = match &self.priority {
            Some(input) => input
                .to_priority()
                .ok_or_else(|| ApiError::invalid("priority", "Priority must be 1, 2 or 3"))?,
            None => current
                .and_then(|t| Priority::from_i32(t.priority))
                .unwrap_or_default(),
        };

        let current_due = current.and_then(|t| t.due_date);
        let due_date = match (self.due_date, current) {
            // Re-sending the stored day keeps the stored deadline, even if it has passed
            (Some(date), _) if current_due.map(|d| normalizer.local_date(d)) == Some(date) => {
                current_due
            }
            (Some(date), _) => {
                normalizer.validate_not_past(date, now)?;
                Some(normalizer.end_of_day(date))
            }
            (None, Some(_)) => current_due,
            (None, None) => Some(normalizer.default_due(focus_minutes, now)),
        };

        let current_status = current.map_or(TaskStatus::NotStarted, |t| t.status);

        Ok(TaskFields {
            title,
            description: self
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            due_date,
            status: TaskStatus::resolve(self.status, self.completed, current_status),
            priority,
            reminder_set: self
                .reminder_set
                .unwrap_or_else(|| current.map_or(false, |t| t.reminder_set)),
        })
    }
}

/// Task list response
#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskResponse>,
    pub total: usize,
}

/// Bulk action request
#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub task_ids: Vec<Uuid>,
}

/// Bulk action response
#[derive(Debug, Serialize)]
pub struct BulkResponse {
    pub success: bool,

    /// Tasks actually changed
    pub count: u64,
}

/// Toggle completion response
#[derive(Debug, Serialize)]
pub struct ToggleCompleteResponse {
    pub success: bool,
    pub completed: bool,
    pub status: TaskStatus,
}

/// Toggle reminder response
#[derive(Debug, Serialize)]
pub struct ToggleReminderResponse {
    pub success: bool,
    pub reminder_set: bool,
}

/// Advanced search request
#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    pub title: Option<String>,
    pub description: Option<String>,

    /// "any" (default), "true" or "false"
    pub completed: Option<String>,

    /// 1-3; anything else matches all priorities
    pub priority: Option<PriorityInput>,
}

impl SearchRequest {
    pub fn criteria(&self) -> TaskSearch {
        let completed = match self.completed.as_deref().map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("true") => Some(true),
            Some(v) if v.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        };

        TaskSearch {
            title: self.title.clone(),
            description: self.description.clone(),
            completed,
            priority: self.priority.as_ref().and_then(PriorityInput::to_priority),
        }
    }
}

/// One exported task
#[derive(Debug, Serialize)]
pub struct ExportedTask {
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub status: TaskStatus,

    /// YYYY-MM-DD in the reference timezone
    pub due_date: Option<String>,

    pub priority: i32,
    pub reminder_set: bool,
}

impl ExportedTask {
    pub fn new(task: Task, normalizer: &DueDateNormalizer) -> Self {
        Self {
            completed: task.completed(),
            due_date: task
                .due_date
                .map(|d| normalizer.local_date(d).format("%Y-%m-%d").to_string()),
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            reminder_set: task.reminder_set,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub tasks: Vec<ExportedTask>,
}

/// Loads a task and checks that the caller owns it
async fn owned_task(state: &AppState, auth: &AuthContext, id: Uuid) -> ApiResult<Task> {
    let task = Task::find_by_id(&state.db, id).await?;
    Ok(require_task_access(auth, id, task)?)
}

/// The row vanished between the ownership check and the write
fn gone(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("Task {} not found", id))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<TaskListResponse>> {
    let mut tasks = Task::list_by_user(&state.db, auth.user_id).await?;
    sort_tasks(&mut tasks);

    let now = state.now().naive_utc();
    let tasks: Vec<TaskResponse> = tasks
        .into_iter()
        .map(|t| TaskResponse::new(t, &state.normalizer, now))
        .collect();

    Ok(Json(TaskListResponse {
        total: tasks.len(),
        tasks,
    }))
}

/// Create a task
///
/// # Endpoint
///
/// ```text
/// POST /v1/tasks
///
/// {
///   "title": "Pay rent",
///   "description": "Transfer before noon",
///   "due_date": "2024-06-01",
///   "priority": 1,
///   "reminder_set": true
/// }
/// ```
///
/// A given `due_date` is stored as 23:59 that day in the reference timezone.
/// Without one, the task is due one focus session from now.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Invalid title, description, priority or a
///   due date in the past
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<TaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskResponse>)> {
    let now = state.now();
    let focus_minutes = Preferences::focus_minutes_for_user(&state.db, auth.user_id).await?;
    let fields = req.into_fields(None, &state.normalizer, focus_minutes, now)?;

    let task = Task::create(
        &state.db,
        CreateTask {
            user_id: auth.user_id,
            title: fields.title,
            description: fields.description,
            due_date: fields.due_date,
            status: fields.status,
            priority: fields.priority.value(),
            reminder_set: fields.reminder_set,
        },
    )
    .await?;

    tracing::debug!(user_id = %auth.user_id, task_id = %task.id, due = ?fields.due_date, "Task created");
    state
        .audit(auth.user_id, format!("Created task: {}", task.title))
        .await;

    Ok((
        StatusCode::CREATED,
        Json(TaskResponse::new(task, &state.normalizer, now.naive_utc())),
    ))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<TaskResponse>> {
    let task = owned_task(&state, &auth, id).await?;
    Ok(Json(TaskResponse::new(
        task,
        &state.normalizer,
        state.now().naive_utc(),
    )))
}

/// Replace a task's editable fields
///
/// Same body as create. Omitted `priority`, `reminder_set`, `status` and
/// `due_date` keep their current values; `completed: false` reopens a
/// completed task. Re-sending the stored day keeps an overdue deadline.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<TaskRequest>,
) -> ApiResult<Json<TaskResponse>> {
    let current = owned_task(&state, &auth, id).await?;

    let now = state.now();
    let focus_minutes = Preferences::focus_minutes_for_user(&state.db, auth.user_id).await?;
    let fields = req.into_fields(Some(&current), &state.normalizer, focus_minutes, now)?;

    let task = Task::update(
        &state.db,
        id,
        auth.user_id,
        UpdateTask {
            title: fields.title,
            description: fields.description,
            due_date: fields.due_date,
            status: fields.status,
            priority: fields.priority.value(),
            reminder_set: fields.reminder_set,
        },
    )
    .await?
    .ok_or_else(|| gone(id))?;

    state
        .audit(
            auth.user_id,
            format!("Edited task from '{}' to '{}'", current.title, task.title),
        )
        .await;

    Ok(Json(TaskResponse::new(task, &state.normalizer, now.naive_utc())))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let task = owned_task(&state, &auth, id).await?;

    if !Task::delete(&state.db, id, auth.user_id).await? {
        return Err(gone(id));
    }

    state
        .audit(auth.user_id, format!("Deleted task: {}", task.title))
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Toggle completion
///
/// Completed tasks reopen as `not_started`; anything else becomes `completed`.
///
/// ```json
/// { "success": true, "completed": true, "status": "completed" }
/// ```
pub async fn toggle_complete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ToggleCompleteResponse>> {
    let task = owned_task(&state, &auth, id).await?;

    let task = Task::set_status(&state.db, id, auth.user_id, task.status.toggled())
        .await?
        .ok_or_else(|| gone(id))?;

    state
        .audit(
            auth.user_id,
            format!(
                "Toggled task completion for '{}' to {}",
                task.title,
                task.completed()
            ),
        )
        .await;

    Ok(Json(ToggleCompleteResponse {
        success: true,
        completed: task.completed(),
        status: task.status,
    }))
}

pub async fn toggle_reminder(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ToggleReminderResponse>> {
    owned_task(&state, &auth, id).await?;

    let task = Task::toggle_reminder(&state.db, id, auth.user_id)
        .await?
        .ok_or_else(|| gone(id))?;

    state
        .audit(
            auth.user_id,
            format!(
                "Toggled reminder for task '{}' to {}",
                task.title, task.reminder_set
            ),
        )
        .await;

    Ok(Json(ToggleReminderResponse {
        success: true,
        reminder_set: task.reminder_set,
    }))
}

/// Complete several tasks
///
/// IDs that do not belong to the caller are ignored; `count` is the number of
/// tasks that changed.
pub async fn bulk_complete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<BulkRequest>,
) -> ApiResult<Json<BulkResponse>> {
    let count = Task::bulk_complete(&state.db, auth.user_id, &req.task_ids).await?;

    state
        .audit(
            auth.user_id,
            format!("Bulk marked {} tasks as completed", count),
        )
        .await;

    Ok(Json(BulkResponse {
        success: true,
        count,
    }))
}

/// Delete several tasks; same ownership rule as bulk complete
pub async fn bulk_delete(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<BulkRequest>,
) -> ApiResult<Json<BulkResponse>> {
    let count = Task::bulk_delete(&state.db, auth.user_id, &req.task_ids).await?;

    state
        .audit(auth.user_id, format!("Bulk deleted {} tasks", count))
        .await;

    Ok(Json(BulkResponse {
        success: true,
        count,
    }))
}

/// Advanced search
///
/// ```text
/// POST /v1/tasks/search
///
/// { "title": "rent", "completed": "false", "priority": "1" }
/// ```
pub async fn search_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<SearchRequest>,
) -> ApiResult<Json<TaskListResponse>> {
    let tasks = Task::search(&state.db, auth.user_id, &req.criteria()).await?;

    let now = state.now().naive_utc();
    let tasks: Vec<TaskResponse> = tasks
        .into_iter()
        .map(|t| TaskResponse::new(t, &state.normalizer, now))
        .collect();

    Ok(Json(TaskListResponse {
        total: tasks.len(),
        tasks,
    }))
}

/// Export all tasks
///
/// ```json
/// {
///   "tasks": [
///     {
///       "title": "Pay rent",
///       "description": null,
///       "completed": false,
///       "status": "not_started",
///       "due_date": "2024-06-01",
///       "priority": 1,
///       "reminder_set": true
///     }
///   ]
/// }
/// ```
pub async fn export_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ExportResponse>> {
    let tasks = Task::list_by_user(&state.db, auth.user_id).await?;

    let tasks = tasks
        .into_iter()
        .map(|t| ExportedTask::new(t, &state.normalizer))
        .collect();

    state.audit(auth.user_id, "Exported tasks as JSON").await;

    Ok(Json(ExportResponse { tasks }))
}
