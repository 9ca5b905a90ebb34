/// Append-only audit trail of user actions
///
/// Every entry is also emitted on the `neuronudge::audit` tracing target, so
/// the trail is visible in logs even when the insert fails.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Longest action text stored (column is VARCHAR(255))
pub const MAX_ACTION_LEN: usize = 255;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActivityLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub created_at: DateTime<Utc>,
}

impl ActivityLog {
    /// Logs and stores an action
    pub async fn record(pool: &PgPool, user_id: Uuid, action: &str) -> Result<Self, sqlx::Error> {
        tracing::info!(target: "neuronudge::audit", %user_id, action, "User action");

        sqlx::query_as::<_, ActivityLog>(
            r#"
            INSERT INTO activity_logs (user_id, action)
            VALUES ($1, $2)
            RETURNING id, user_id, action, created_at
            "#,
        )
        .bind(user_id)
        .bind(truncate_action(action))
        .fetch_one(pool)
        .await
    }

    /// Most recent entries for a user, newest first
    pub async fn list_recent(
        pool: &PgPool,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, ActivityLog>(
            r#"
            SELECT id, user_id, action, created_at
            FROM activity_logs
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}

/// Cuts the action to the column width on a char boundary
fn truncate_action(action: &str) -> &str {
    if action.len() <= MAX_ACTION_LEN {
        return action;
    }

    let mut end = MAX_ACTION_LEN;
    while !action.is_char_boundary(end) {
        end -= 1;
    }
    &action[..end]
}
