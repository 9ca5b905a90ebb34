/// Profile endpoints
///
/// - `GET  /v1/profile` - Current account
/// - `PUT  /v1/profile` - Change username, email, profile kind or toggles
/// - `POST /v1/profile/password` - Change password
/// - `POST /v1/profile/avatar` - Upload a new avatar (multipart field `avatar`)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::auth::{check_new_password, normalize_email, parse_profile_kind},
};
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Extension, Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use neuronudge_shared::{
    auth::{middleware::AuthContext, password},
    models::user::{FeatureToggles, ProfileKind, UpdateUser, User, Widget},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;
use validator::Validate;

/// Accepted avatar file extensions
pub const AVATAR_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// Public URL prefix for uploaded files
const UPLOADS_URL_PREFIX: &str = "/uploads";

/// Account as returned to its owner
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub name: Option<String>,
    pub username: String,
    pub email: String,
    pub profile_kind: ProfileKind,
    pub features: FeatureToggles,
    pub widgets: Vec<Widget>,
    pub dashboard_template: &'static str,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<User> for ProfileResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            widgets: user.features.widgets(),
            dashboard_template: user.dashboard_template(),
            avatar_url: user
                .avatar_path
                .as_deref()
                .map(|file| format!("{UPLOADS_URL_PREFIX}/{file}")),
            name: user.name,
            username: user.username,
            email: user.email,
            profile_kind: user.profile_kind,
            features: user.features,
            created_at: user.created_at,
            last_login_at: user.last_login_at,
        }
    }
}

/// Profile update request; omitted fields are left unchanged
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 4, max = 20, message = "Username must be 4-20 characters"))]
    pub username: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub profile_kind: Option<String>,

    pub features: Option<FeatureToggles>,
}

impl UpdateProfileRequest {
    /// Trims text fields so length rules apply to what is stored
    fn trimmed(self) -> Self {
        Self {
            username: self.username.map(|u| u.trim().to_string()),
            email: self.email.map(|e| e.trim().to_string()),
            ..self
        }
    }
}

/// Password change request
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Avatar upload response
#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub avatar_url: String,
}

async fn load_user(state: &AppState, auth: &AuthContext) -> ApiResult<User> {
    User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

/// Current account
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ProfileResponse>> {
    let user = load_user(&state, &auth).await?;
    Ok(Json(ProfileResponse::from(user)))
}

/// Update the current account
///
/// # Endpoint
///
/// ```text
/// PUT /v1/profile
///
/// { "username": "samr2", "profile_kind": "dyslexia" }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `409 Conflict`: Username or email used by another account
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateProfileRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    let req = req.trimmed();
    req.validate()?;
    let profile_kind = req
        .profile_kind
        .as_deref()
        .map(|kind| parse_profile_kind(Some(kind)))
        .transpose()?;

    let current = load_user(&state, &auth).await?;

    let username = req.username;
    let email = req.email.as_deref().map(normalize_email);

    if let Some(username) = &username {
        if User::username_taken(&state.db, username, Some(auth.user_id)).await? {
            return Err(ApiError::Conflict("Username already taken".to_string()));
        }
    }
    if let Some(email) = &email {
        if User::email_taken(&state.db, email, Some(auth.user_id)).await? {
            return Err(ApiError::Conflict("Email already registered".to_string()));
        }
    }

    let user = User::update(
        &state.db,
        auth.user_id,
        UpdateUser {
            username,
            email,
            profile_kind,
            features: req.features,
            ..UpdateUser::default()
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    state
        .audit(
            auth.user_id,
            format!(
                "Updated profile from username '{}' to '{}'",
                current.username, user.username
            ),
        )
        .await;

    Ok(Json(ProfileResponse::from(user)))
}

/// Change password
///
/// # Errors
///
/// - `401 Unauthorized`: Old password is wrong
/// - `422 Unprocessable Entity`: New password fails the policy or does not match
pub async fn change_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<StatusCode> {
    check_new_password("new_password", &req.new_password, &req.confirm_password)?;

    let user = load_user(&state, &auth).await?;
    if !password::verify_password(&req.old_password, &user.password_hash)? {
        return Err(ApiError::Unauthorized("Old password is incorrect".to_string()));
    }

    let password_hash = password::hash_password(&req.new_password)?;
    User::update(
        &state.db,
        auth.user_id,
        UpdateUser {
            password_hash: Some(password_hash),
            ..UpdateUser::default()
        },
    )
    .await?;

    state.audit(auth.user_id, "Changed password").await;
    Ok(StatusCode::NO_CONTENT)
}

/// Lowercased extension of an accepted avatar file name
pub fn avatar_extension(file_name: &str) -> Option<String> {
    let ext = Path::new(file_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();

    AVATAR_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Whether a stored avatar path is a bare file name inside the upload dir
fn is_plain_file_name(stored: &str) -> bool {
    Path::new(stored).file_name().and_then(|n| n.to_str()) == Some(stored)
}

/// Upload avatar
///
/// # Endpoint
///
/// ```text
/// POST /v1/profile/avatar
/// Content-Type: multipart/form-data; boundary=...
///
/// avatar=<png|jpg|jpeg|gif file>
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing field, empty file or unsupported extension
/// - `413 Payload Too Large`: File exceeds the configured limit
pub async fn upload_avatar(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    mut multipart: Multipart,
) -> ApiResult<Json<AvatarResponse>> {
    let mut upload: Option<(String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("avatar") {
            continue;
        }

        let ext = field
            .file_name()
            .and_then(avatar_extension)
            .ok_or_else(|| {
                ApiError::BadRequest(format!(
                    "Avatar must be one of: {}",
                    AVATAR_EXTENSIONS.join(", ")
                ))
            })?;

        upload = Some((ext, field.bytes().await?));
        break;
    }

    let (ext, data) =
        upload.ok_or_else(|| ApiError::BadRequest("Missing 'avatar' file field".to_string()))?;

    if data.is_empty() {
        return Err(ApiError::BadRequest("Avatar file is empty".to_string()));
    }
    let max_bytes = state.config.uploads.max_avatar_bytes;
    if data.len() > max_bytes {
        return Err(ApiError::PayloadTooLarge(format!(
            "Avatar must be at most {} bytes",
            max_bytes
        )));
    }

    let user = load_user(&state, &auth).await?;

    let dir = &state.config.uploads.dir;
    tokio::fs::create_dir_all(dir).await?;

    let file_name = format!("{}.{}", Uuid::new_v4(), ext);
    tokio::fs::write(dir.join(&file_name), &data).await?;

    User::update(
        &state.db,
        auth.user_id,
        UpdateUser {
            avatar_path: Some(Some(file_name.clone())),
            ..UpdateUser::default()
        },
    )
    .await?;

    if let Some(old) = user.avatar_path.filter(|old| is_plain_file_name(old)) {
        match tokio::fs::remove_file(dir.join(&old)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(file = %old, error = %e, "Failed to remove previous avatar"),
        }
    }

    tracing::debug!(user_id = %auth.user_id, bytes = data.len(), "Avatar stored");
    state.audit(auth.user_id, "Uploaded avatar").await;

    Ok(Json(AvatarResponse {
        avatar_url: format!("{UPLOADS_URL_PREFIX}/{file_name}"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_avatar_extension() {
        assert_eq!(avatar_extension("me.PNG").as_deref(), Some("png"));
        assert_eq!(avatar_extension("photo.jpeg").as_deref(), Some("jpeg"));
        assert_eq!(avatar_extension("anim.gif").as_deref(), Some("gif"));
        assert_eq!(avatar_extension("script.svg"), None);
        assert_eq!(avatar_extension("noext"), None);
    }

    #[test]
    fn test_plain_file_name() {
        assert!(is_plain_file_name("3f2b.png"));
        assert!(!is_plain_file_name("../etc/passwd"));
        assert!(!is_plain_file_name("nested/avatar.png"));
    }

    #[test]
    fn test_profile_response_from_user() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: Some("Sam Rivera".to_string()),
            username: "samr".to_string(),
            email: "sam@example.com".to_string(),
            password_hash: "$argon2id$...".to_string(),
            profile_kind: ProfileKind::Adhd,
            features: FeatureToggles::preset_for(ProfileKind::Adhd),
            avatar_path: Some("abc.png".to_string()),
            created_at: now,
            updated_at: now,
            last_login_at: None,
        };

        let view = ProfileResponse::from(user);
        assert_eq!(view.dashboard_template, "dashboard_adhd");
        assert_eq!(view.avatar_url.as_deref(), Some("/uploads/abc.png"));
        assert!(view.widgets.contains(&Widget::FocusMode));

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("password_hash").is_none());
    }
    #[test]
    fn test_update_request_trims_before_validation() {
        let req = UpdateProfileRequest {
            username: Some("  ab  ".to_string()),
            email: None,
            profile_kind: None,
            features: None,
        }
        .trimmed();

        assert_eq!(req.username.as_deref(), Some("ab"));
        assert!(req.validate().is_err());

        let req = UpdateProfileRequest {
            username: Some("  samr  ".to_string()),
            email: Some(" sam@example.com".to_string()),
            profile_kind: None,
            features: None,
        }
        .trimmed();
        assert!(req.validate().is_ok());
    }
}
