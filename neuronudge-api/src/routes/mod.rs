/// API route handlers, organized by resource
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, token refresh and logout
/// - `dashboard`: Filtered, paginated task overview
/// - `tasks`: Task CRUD, toggles, bulk actions, search and export
/// - `profile`: Account details, password change and avatar upload
/// - `preferences`: Focus/break timer and display settings
/// - `activity`: Recent audit trail

pub mod activity;
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod preferences;
pub mod profile;
pub mod tasks;
