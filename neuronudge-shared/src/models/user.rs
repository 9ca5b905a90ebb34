/// User model and database operations
///
/// Users own tasks, one optional preferences record and an activity log.
/// Each user has a profile kind that selects the dashboard template, and a
/// set of feature toggles that select the dashboard widgets.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE profile_kind AS ENUM ('general', 'adhd', 'dyslexia', 'custom');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(150),
///     username VARCHAR(150) NOT NULL UNIQUE,
///     email VARCHAR(255) NOT NULL,  -- unique on LOWER(email)
///     password_hash VARCHAR(255) NOT NULL,
///     profile_kind profile_kind NOT NULL DEFAULT 'general',
///     feature_task_timer BOOLEAN NOT NULL DEFAULT FALSE,
///     ...
///     avatar_path VARCHAR(512),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use neuronudge_shared::models::user::{CreateUser, FeatureToggles, ProfileKind, User};
/// use neuronudge_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     name: Some("Sam Rivera".to_string()),
///     username: "samr".to_string(),
///     email: "sam@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     profile_kind: ProfileKind::Adhd,
///     features: FeatureToggles::preset_for(ProfileKind::Adhd),
/// }).await?;
///
/// let found = User::find_by_email(&pool, "SAM@example.com").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, name, username, email, password_hash, profile_kind, \
    feature_task_timer, feature_task_stats, feature_focus_mode, feature_deadline_tracker, \
    feature_priority_sort, feature_task_export, feature_progress_graphs, \
    avatar_path, created_at, updated_at, last_login_at";

/// User classification that selects the dashboard template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "profile_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    #[default]
    General,
    Adhd,
    Dyslexia,
    Custom,
}

impl ProfileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileKind::General => "general",
            ProfileKind::Adhd => "adhd",
            ProfileKind::Dyslexia => "dyslexia",
            ProfileKind::Custom => "custom",
        }
    }

    /// Name of the dashboard template for this profile
    pub fn dashboard_template(&self) -> &'static str {
        match self {
            ProfileKind::General => "dashboard_general",
            ProfileKind::Adhd => "dashboard_adhd",
            ProfileKind::Dyslexia => "dashboard_dyslexia",
            ProfileKind::Custom => "dashboard_custom",
        }
    }
}

impl std::str::FromStr for ProfileKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(ProfileKind::General),
            "adhd" => Ok(ProfileKind::Adhd),
            "dyslexia" => Ok(ProfileKind::Dyslexia),
            "custom" => Ok(ProfileKind::Custom),
            other => Err(format!("Unknown profile kind: {}", other)),
        }
    }
}

/// Dashboard widget enabled by a feature toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Widget {
    TaskTimer,
    TaskStats,
    FocusMode,
    DeadlineTracker,
    PrioritySort,
    TaskExport,
    ProgressGraphs,
}

/// Per-user dashboard feature toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct FeatureToggles {
    #[sqlx(rename = "feature_task_timer")]
    pub task_timer: bool,

    #[sqlx(rename = "feature_task_stats")]
    pub task_stats: bool,

    #[sqlx(rename = "feature_focus_mode")]
    pub focus_mode: bool,

    #[sqlx(rename = "feature_deadline_tracker")]
    pub deadline_tracker: bool,

    #[sqlx(rename = "feature_priority_sort")]
    pub priority_sort: bool,

    #[sqlx(rename = "feature_task_export")]
    pub task_export: bool,

    #[sqlx(rename = "feature_progress_graphs")]
    pub progress_graphs: bool,
}

impl FeatureToggles {
    /// Default toggles for a newly registered profile
    pub fn preset_for(kind: ProfileKind) -> Self {
        match kind {
            ProfileKind::Adhd => Self {
                task_timer: true,
                focus_mode: true,
                deadline_tracker: true,
                priority_sort: true,
                ..Self::default()
            },
            ProfileKind::Dyslexia => Self {
                task_stats: true,
                priority_sort: true,
                progress_graphs: true,
                ..Self::default()
            },
            ProfileKind::General => Self {
                task_stats: true,
                deadline_tracker: true,
                task_export: true,
                ..Self::default()
            },
            ProfileKind::Custom => Self::default(),
        }
    }

    /// Enabled widgets in display order
    pub fn widgets(&self) -> Vec<Widget> {
        [
            (self.task_timer, Widget::TaskTimer),
            (self.task_stats, Widget::TaskStats),
            (self.focus_mode, Widget::FocusMode),
            (self.deadline_tracker, Widget::DeadlineTracker),
            (self.priority_sort, Widget::PrioritySort),
            (self.task_export, Widget::TaskExport),
            (self.progress_graphs, Widget::ProgressGraphs),
        ]
        .into_iter()
        .filter_map(|(enabled, widget)| enabled.then_some(widget))
        .collect()
    }
}

/// User model representing an account
///
/// Passwords are stored as Argon2id hashes, never in plaintext.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Optional full name
    pub name: Option<String>,

    /// Unique username
    pub username: String,

    /// Email address, unique case-insensitively
    pub email: String,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Profile classification
    pub profile_kind: ProfileKind,

    /// Dashboard feature toggles
    #[sqlx(flatten)]
    pub features: FeatureToggles,

    /// Avatar file name relative to the upload directory
    pub avatar_path: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub name: Option<String>,
    pub username: String,
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    pub profile_kind: ProfileKind,
    pub features: FeatureToggles,
}

/// Input for updating an existing user
///
/// All fields are optional. Only non-None fields will be updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub profile_kind: Option<ProfileKind>,
    pub features: Option<FeatureToggles>,

    /// New avatar file name (use Some(None) to clear)
    pub avatar_path: Option<Option<String>>,
}

impl User {
    /// Dashboard template for this user's profile
    pub fn dashboard_template(&self) -> &'static str {
        self.profile_kind.dashboard_template()
    }

    /// Creates a new user in the database
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Email or username already exists (unique constraint violation)
    /// - Database connection fails
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO users (
                name, username, email, password_hash, profile_kind,
                feature_task_timer, feature_task_stats, feature_focus_mode,
                feature_deadline_tracker, feature_priority_sort, feature_task_export,
                feature_progress_graphs
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {USER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, User>(&query)
            .bind(data.name)
            .bind(data.username)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.profile_kind)
            .bind(data.features.task_timer)
            .bind(data.features.task_stats)
            .bind(data.features.focus_mode)
            .bind(data.features.deadline_tracker)
            .bind(data.features.priority_sort)
            .bind(data.features.task_export)
            .bind(data.features.progress_graphs)
            .fetch_one(pool)
            .await
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email address, ignoring case
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");

        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Whether another user already uses this email
    pub async fn email_taken(
        pool: &PgPool,
        email: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(exclude)
        .fetch_one(pool)
        .await
    }

    /// Whether another user already uses this username
    pub async fn username_taken(
        pool: &PgPool,
        username: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(username)
        .bind(exclude)
        .fetch_one(pool)
        .await
    }

    /// Updates an existing user
    ///
    /// Only non-None fields in `data` will be updated. The `updated_at`
    /// timestamp is always refreshed.
    ///
    /// # Returns
    ///
    /// The updated user if found, None if user doesn't exist
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        let mut push_column = |query: &mut String, column: &str| {
            bind_count += 1;
            query.push_str(&format!(", {} = ${}", column, bind_count));
        };

        if data.username.is_some() {
            push_column(&mut query, "username");
        }
        if data.email.is_some() {
            push_column(&mut query, "email");
        }
        if data.password_hash.is_some() {
            push_column(&mut query, "password_hash");
        }
        if data.profile_kind.is_some() {
            push_column(&mut query, "profile_kind");
        }
        if data.features.is_some() {
            for column in [
                "feature_task_timer",
                "feature_task_stats",
                "feature_focus_mode",
                "feature_deadline_tracker",
                "feature_priority_sort",
                "feature_task_export",
                "feature_progress_graphs",
            ] {
                push_column(&mut query, column);
            }
        }
        if data.avatar_path.is_some() {
            push_column(&mut query, "avatar_path");
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(username) = data.username {
            q = q.bind(username);
        }
        if let Some(email) = data.email {
            q = q.bind(email);
        }
        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(profile_kind) = data.profile_kind {
            q = q.bind(profile_kind);
        }
        if let Some(features) = data.features {
            q = q
                .bind(features.task_timer)
                .bind(features.task_stats)
                .bind(features.focus_mode)
                .bind(features.deadline_tracker)
                .bind(features.priority_sort)
                .bind(features.task_export)
                .bind(features.progress_graphs);
        }
        if let Some(avatar_opt) = data.avatar_path {
            q = q.bind(avatar_opt);
        }

        q.fetch_optional(pool).await
    }

    /// Deletes a user and, by cascade, everything they own
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Updates the last login timestamp for a user
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET last_login_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
