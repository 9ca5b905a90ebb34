/// Resource ownership checks
///
/// Every task belongs to exactly one user and only that user may read or
/// change it. Handlers load the row first, then run it through
/// [`require_task_access`] before doing anything else, so a missing task and a
/// foreign task are told apart (404 vs 403) and no mutation happens on a
/// foreign row.
///
/// # Example
///
/// ```no_run
/// use neuronudge_shared::auth::authorization::require_task_access;
/// use neuronudge_shared::auth::middleware::AuthContext;
/// use neuronudge_shared::models::task::Task;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, auth: AuthContext, id: Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let task = require_task_access(&auth, id, Task::find_by_id(&pool, id).await?)?;
/// println!("{}", task.title);
/// # Ok(())
/// # }
/// ```

use uuid::Uuid;

use super::middleware::AuthContext;
use crate::models::task::Task;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AuthzError {
    #[error("Task {0} not found")]
    TaskNotFound(Uuid),

    /// Caller doesn't own the resource
    #[error("Not authorized to access this resource")]
    NotOwner,
}

/// Resolves a looked-up task into one the caller may use
pub fn require_task_access(
    auth: &AuthContext,
    task_id: Uuid,
    task: Option<Task>,
) -> Result<Task, AuthzError> {
    let task = task.ok_or(AuthzError::TaskNotFound(task_id))?;
    if !task.is_owned_by(auth.user_id) {
        return Err(AuthzError::NotOwner);
    }
    Ok(task)
}
