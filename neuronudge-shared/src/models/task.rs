/// Task model and database operations
///
/// Tasks belong to exactly one user. The task status is the single source of
/// truth for completion: `completed` is derived from it and never stored.
///
/// # Status Transitions
///
/// ```text
/// not_started ⇄ in_progress
/// not_started → completed
/// in_progress → completed
/// completed   → not_started   (toggle / reopen)
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('not_started', 'in_progress', 'completed');
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     due_date TIMESTAMP,
///     status task_status NOT NULL DEFAULT 'not_started',
///     priority INTEGER NOT NULL DEFAULT 3 CHECK (priority BETWEEN 1 AND 3),
///     reminder_set BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use neuronudge_shared::models::task::{CreateTask, Task, TaskStatus};
/// use neuronudge_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let task = Task::create(&pool, CreateTask {
///     user_id: Uuid::new_v4(),
///     title: "Pay rent".to_string(),
///     description: None,
///     due_date: None,
///     status: TaskStatus::NotStarted,
///     priority: 1,
///     reminder_set: true,
/// }).await?;
///
/// Task::set_status(&pool, task.id, task.user_id, task.status.toggled()).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

const TASK_COLUMNS: &str = "id, user_id, title, description, due_date, status, priority, \
                            reminder_set, created_at, updated_at";

/// Task progress status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task has not been started
    NotStarted,

    /// Task is being worked on
    InProgress,

    /// Task is done
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }

    /// Whether the status counts as completed
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    /// Status after a completion toggle
    ///
    /// Completed tasks reopen as not started; anything else completes.
    pub fn toggled(&self) -> TaskStatus {
        match self {
            TaskStatus::Completed => TaskStatus::NotStarted,
            TaskStatus::NotStarted | TaskStatus::InProgress => TaskStatus::Completed,
        }
    }

    /// Resolves the status from submitted `status` and legacy `completed` fields
    ///
    /// `completed: true` always wins. `completed: false` reopens a completed
    /// task (or overrides a contradictory `status: completed`). Without either
    /// field the current status is kept.
    pub fn resolve(
        status: Option<TaskStatus>,
        completed: Option<bool>,
        current: TaskStatus,
    ) -> TaskStatus {
        match (status, completed) {
            (_, Some(true)) => TaskStatus::Completed,
            (Some(TaskStatus::Completed), Some(false)) => TaskStatus::NotStarted,
            (Some(s), _) => s,
            (None, Some(false)) if current.is_completed() => TaskStatus::NotStarted,
            (None, _) => current,
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "not_started" => Ok(TaskStatus::NotStarted),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(format!("Unknown task status: {}", other)),
        }
    }
}

/// Task priority (1 = high, 3 = low)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    High = 1,
    Medium = 2,
    Low = 3,
}

impl Priority {
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Priority::High),
            2 => Some(Priority::Medium),
            3 => Some(Priority::Low),
            _ => None,
        }
    }

    /// Parses "1", "2" or "3"; anything else is None
    pub fn parse(value: &str) -> Option<Self> {
        value.trim().parse::<i32>().ok().and_then(Self::from_i32)
    }

    pub fn value(&self) -> i32 {
        *self as i32
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Low
    }
}

/// Task model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Short title
    pub title: String,

    /// Optional longer description
    pub description: Option<String>,

    /// Due timestamp as naive UTC (see `due_date` module)
    pub due_date: Option<NaiveDateTime>,

    /// Progress status
    pub status: TaskStatus,

    /// 1 = high, 2 = medium, 3 = low
    pub priority: i32,

    /// Whether the user asked to be reminded
    pub reminder_set: bool,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDateTime>,
    pub status: TaskStatus,
    pub priority: i32,
    pub reminder_set: bool,
}

/// Input for replacing a task's editable fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<NaiveDateTime>,
    pub status: TaskStatus,
    pub priority: i32,
    pub reminder_set: bool,
}

/// Criteria for the advanced task search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskSearch {
    /// Case-insensitive title substring
    pub title: Option<String>,

    /// Case-insensitive description substring
    pub description: Option<String>,

    /// Completed / not completed; None matches both
    pub completed: Option<bool>,

    /// Exact priority; None matches all
    pub priority: Option<Priority>,
}

impl Task {
    /// Whether the task is completed (derived from status)
    pub fn completed(&self) -> bool {
        self.status.is_completed()
    }

    /// Due before `now` and not completed
    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        !self.completed() && self.due_date.map_or(false, |due| due < now)
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    /// Creates a new task
    ///
    /// # Errors
    ///
    /// Returns an error if the owner does not exist or the database fails
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO tasks (user_id, title, description, due_date, status, priority, reminder_set)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(data.user_id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.due_date)
            .bind(data.status)
            .bind(data.priority)
            .bind(data.reminder_set)
            .fetch_one(pool)
            .await
    }

    /// Finds a task by ID regardless of owner
    ///
    /// Callers must check ownership before exposing or mutating the task.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists all of a user's tasks, oldest first
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = $1 ORDER BY created_at ASC, id ASC"
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Replaces a task's editable fields
    ///
    /// The `user_id` guard makes the update a no-op for tasks owned by someone
    /// else; the ownership check happens before this call.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tasks
            SET title = $3,
                description = $4,
                due_date = $5,
                status = $6,
                priority = $7,
                reminder_set = $8,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(user_id)
            .bind(data.title)
            .bind(data.description)
            .bind(data.due_date)
            .bind(data.status)
            .bind(data.priority)
            .bind(data.reminder_set)
            .fetch_optional(pool)
            .await
    }

    /// Sets the status of one task
    pub async fn set_status(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
        status: TaskStatus,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tasks
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(user_id)
            .bind(status)
            .fetch_optional(pool)
            .await
    }

    /// Flips the reminder flag
    pub async fn toggle_reminder(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE tasks
            SET reminder_set = NOT reminder_set, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Deletes one task
    ///
    /// # Returns
    ///
    /// True if a row was deleted
    pub async fn delete(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Marks the user's listed tasks as completed
    ///
    /// IDs owned by other users and already completed tasks are skipped.
    ///
    /// # Returns
    ///
    /// Number of tasks that changed
    pub async fn bulk_complete(
        pool: &PgPool,
        user_id: Uuid,
        ids: &[Uuid],
    ) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = 'completed', updated_at = NOW()
            WHERE user_id = $1 AND id = ANY($2) AND status <> 'completed'
            "#,
        )
        .bind(user_id)
        .bind(ids)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Deletes the user's listed tasks
    ///
    /// # Returns
    ///
    /// Number of tasks deleted
    pub async fn bulk_delete(pool: &PgPool, user_id: Uuid, ids: &[Uuid]) -> Result<u64, sqlx::Error> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM tasks WHERE user_id = $1 AND id = ANY($2)")
            .bind(user_id)
            .bind(ids)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Advanced search over one user's tasks
    ///
    /// Ordered by priority, then due date with tasks without a due date last.
    pub async fn search(
        pool: &PgPool,
        user_id: Uuid,
        criteria: &TaskSearch,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = "));
        builder.push_bind(user_id);

        if let Some(title) = non_empty(criteria.title.as_deref()) {
            builder
                .push(" AND title ILIKE ")
                .push_bind(like_pattern(title))
                .push(" ESCAPE '\\'");
        }
        if let Some(description) = non_empty(criteria.description.as_deref()) {
            builder
                .push(" AND description ILIKE ")
                .push_bind(like_pattern(description))
                .push(" ESCAPE '\\'");
        }
        match criteria.completed {
            Some(true) => {
                builder.push(" AND status = 'completed'");
            }
            Some(false) => {
                builder.push(" AND status <> 'completed'");
            }
            None => {}
        }
        if let Some(priority) = criteria.priority {
            builder.push(" AND priority = ").push_bind(priority.value());
        }

        builder.push(" ORDER BY priority ASC, due_date ASC NULLS LAST, created_at ASC");

        builder.build_query_as::<Task>().fetch_all(pool).await
    }

    /// Counts a user's tasks
    pub async fn count_by_user(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Wraps a search term for ILIKE, escaping wildcard characters
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
