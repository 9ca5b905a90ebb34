/// Per-user preferences
///
/// At most one row per user. The row is created lazily by the first save;
/// until then readers get [`PreferenceValues::default`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE preferences (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
///     focus_minutes INTEGER NOT NULL DEFAULT 25 CHECK (focus_minutes > 0),
///     break_minutes INTEGER NOT NULL DEFAULT 5 CHECK (break_minutes > 0),
///     long_break_minutes INTEGER NOT NULL DEFAULT 15 CHECK (long_break_minutes > 0),
///     session_goal INTEGER NOT NULL DEFAULT 4 CHECK (session_goal > 0),
///     notifications_enabled BOOLEAN NOT NULL DEFAULT TRUE,
///     dark_mode_enabled BOOLEAN NOT NULL DEFAULT FALSE,
///     theme_color VARCHAR(20) NOT NULL DEFAULT 'blue',
///     font_size VARCHAR(10) NOT NULL DEFAULT 'medium',
///     sound_enabled BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::due_date::DEFAULT_FOCUS_MINUTES;

const PREFERENCE_COLUMNS: &str = "id, user_id, focus_minutes, break_minutes, long_break_minutes, \
    session_goal, notifications_enabled, dark_mode_enabled, theme_color, font_size, \
    sound_enabled, created_at, updated_at";

/// Stored preferences row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Preferences {
    pub id: Uuid,
    pub user_id: Uuid,

    #[sqlx(flatten)]
    #[serde(flatten)]
    pub values: PreferenceValues,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The user-editable preference fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, sqlx::FromRow)]
pub struct PreferenceValues {
    /// Focus session length; also the default due-date offset
    #[validate(range(min = 1, max = 240, message = "Focus time must be 1-240 minutes"))]
    pub focus_minutes: i32,

    #[validate(range(min = 1, max = 120, message = "Break time must be 1-120 minutes"))]
    pub break_minutes: i32,

    #[validate(range(min = 1, max = 240, message = "Long break time must be 1-240 minutes"))]
    pub long_break_minutes: i32,

    /// Focus sessions per day
    #[validate(range(min = 1, max = 24, message = "Session goal must be 1-24"))]
    pub session_goal: i32,

    pub notifications_enabled: bool,
    pub dark_mode_enabled: bool,

    #[validate(length(min = 1, max = 20, message = "Theme color must be 1-20 characters"))]
    pub theme_color: String,

    #[validate(custom(function = "validate_font_size"))]
    pub font_size: String,

    pub sound_enabled: bool,
}

impl Default for PreferenceValues {
    fn default() -> Self {
        Self {
            focus_minutes: DEFAULT_FOCUS_MINUTES,
            break_minutes: 5,
            long_break_minutes: 15,
            session_goal: 4,
            notifications_enabled: true,
            dark_mode_enabled: false,
            theme_color: "blue".to_string(),
            font_size: "medium".to_string(),
            sound_enabled: true,
        }
    }
}

fn validate_font_size(value: &str) -> Result<(), validator::ValidationError> {
    match value {
        "small" | "medium" | "large" => Ok(()),
        _ => {
            let mut err = validator::ValidationError::new("font_size");
            err.message = Some("Font size must be small, medium or large".into());
            Err(err)
        }
    }
}

impl Preferences {
    /// Finds the preferences row for a user, if one was saved
    pub async fn find_by_user(pool: &PgPool, user_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {PREFERENCE_COLUMNS} FROM preferences WHERE user_id = $1");

        sqlx::query_as::<_, Preferences>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Stored values for a user, or the defaults if none were saved
    pub async fn values_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<PreferenceValues, sqlx::Error> {
        Ok(Self::find_by_user(pool, user_id)
            .await?
            .map(|p| p.values)
            .unwrap_or_default())
    }

    /// The user's focus duration in minutes, if preferences were saved
    pub async fn focus_minutes_for_user(
        pool: &PgPool,
        user_id: Uuid,
    ) -> Result<Option<i32>, sqlx::Error> {
        sqlx::query_scalar("SELECT focus_minutes FROM preferences WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Creates or replaces the user's preferences
    pub async fn upsert(
        pool: &PgPool,
        user_id: Uuid,
        values: &PreferenceValues,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO preferences (
                user_id, focus_minutes, break_minutes, long_break_minutes, session_goal,
                notifications_enabled, dark_mode_enabled, theme_color, font_size, sound_enabled
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (user_id) DO UPDATE
            SET focus_minutes = EXCLUDED.focus_minutes,
                break_minutes = EXCLUDED.break_minutes,
                long_break_minutes = EXCLUDED.long_break_minutes,
                session_goal = EXCLUDED.session_goal,
                notifications_enabled = EXCLUDED.notifications_enabled,
                dark_mode_enabled = EXCLUDED.dark_mode_enabled,
                theme_color = EXCLUDED.theme_color,
                font_size = EXCLUDED.font_size,
                sound_enabled = EXCLUDED.sound_enabled,
                updated_at = NOW()
            RETURNING {PREFERENCE_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Preferences>(&query)
            .bind(user_id)
            .bind(values.focus_minutes)
            .bind(values.break_minutes)
            .bind(values.long_break_minutes)
            .bind(values.session_goal)
            .bind(values.notifications_enabled)
            .bind(values.dark_mode_enabled)
            .bind(&values.theme_color)
            .bind(&values.font_size)
            .bind(values.sound_enabled)
            .fetch_one(pool)
            .await
    }
}
