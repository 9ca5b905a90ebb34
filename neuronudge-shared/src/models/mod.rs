/// Database models for Neuronudge
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `user`: Accounts, profile kinds and dashboard feature toggles
/// - `task`: Tasks with due dates, priority and status
/// - `preferences`: Per-user focus/break durations and theming
/// - `activity_log`: Audit trail of user actions
///
/// # Example
///
/// ```no_run
/// use neuronudge_shared::models::task::Task;
/// use neuronudge_shared::db::pool::{create_pool, DatabaseConfig};
/// use uuid::Uuid;
///
/// # async fn example(user_id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let tasks = Task::list_by_user(&pool, user_id).await?;
/// println!("{} tasks", tasks.len());
/// # Ok(())
/// # }
/// ```

pub mod activity_log;
pub mod preferences;
pub mod task;
pub mod user;
