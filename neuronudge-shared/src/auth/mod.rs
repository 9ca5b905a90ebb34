/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and the account password policy
/// - [`jwt`]: Access/refresh token issue and validation
/// - [`middleware`]: Bearer token extraction and access token validation
/// - [`authorization`]: Ownership checks for user-owned rows
///
/// # Example
///
/// ```no_run
/// use neuronudge_shared::auth::jwt::issue_token_pair;
/// use neuronudge_shared::auth::password::{hash_password, verify_password};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("focus2024")?;
/// assert!(verify_password("focus2024", &hash)?);
///
/// let tokens = issue_token_pair(Uuid::new_v4(), "a-secret-of-at-least-thirty-two-bytes")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
