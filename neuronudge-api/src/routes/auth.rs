/// Authentication endpoints
///
/// - `POST /v1/auth/register` - Create an account and receive tokens
/// - `POST /v1/auth/login` - Exchange email and password for tokens
/// - `POST /v1/auth/refresh` - Exchange a refresh token for an access token
/// - `POST /v1/auth/logout` - Record the logout (tokens are stateless)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    routes::profile::ProfileResponse,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use neuronudge_shared::{
    auth::{
        jwt::{self, TokenPair},
        middleware::AuthContext,
        password,
    },
    models::user::{CreateUser, FeatureToggles, ProfileKind, User},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Optional full name
    #[validate(length(min = 2, max = 50, message = "Name must be 2-50 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 4, max = 20, message = "Username must be 4-20 characters"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Checked against the password policy after field validation
    pub password: String,

    pub confirm_password: String,

    /// general, adhd, dyslexia or custom (default: general)
    pub profile_kind: Option<String>,

    /// Dashboard toggles; the profile preset is used when omitted
    pub features: Option<FeatureToggles>,
}

impl RegisterRequest {
    /// Trims text fields so length rules apply to what is stored
    fn trimmed(self) -> Self {
        Self {
            name: self.name.map(|n| n.trim().to_string()),
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            ..self
        }
    }
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

/// Tokens plus the account they belong to
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: ProfileResponse,

    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

/// Normalized form of an email address used for storage and lookup
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Parses an optional profile kind, defaulting to general
pub(crate) fn parse_profile_kind(value: Option<&str>) -> ApiResult<ProfileKind> {
    match value {
        None => Ok(ProfileKind::default()),
        Some(raw) => raw
            .parse()
            .map_err(|e: String| ApiError::invalid("profile_kind", e)),
    }
}

/// Runs the password policy and the confirmation match
pub(crate) fn check_new_password(
    field: &str,
    password: &str,
    confirm: &str,
) -> ApiResult<()> {
    let mut details = Vec::new();

    if let Err(msg) = password::validate_password_strength(password) {
        details.push(ValidationErrorDetail::new(field, msg));
    }
    if password != confirm {
        details.push(ValidationErrorDetail::new(
            "confirm_password",
            "Passwords must match",
        ));
    }

    if details.is_empty() {
        Ok(())
    } else {
        Err(ApiError::ValidationError(details))
    }
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "name": "Sam Rivera",
///   "username": "samr",
///   "email": "sam@example.com",
///   "password": "focus2024",
///   "confirm_password": "focus2024",
///   "profile_kind": "adhd"
/// }
/// ```
///
/// # Response
///
/// `201 Created` with the new profile and a token pair.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `409 Conflict`: Email or username already in use
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let req = req.trimmed();
    req.validate()?;
    check_new_password("password", &req.password, &req.confirm_password)?;
    let profile_kind = parse_profile_kind(req.profile_kind.as_deref())?;

    let email = normalize_email(&req.email);
    let username = req.username;

    if User::email_taken(&state.db, &email, None).await? {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }
    if User::username_taken(&state.db, &username, None).await? {
        return Err(ApiError::Conflict("Username already taken".to_string()));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            name: req.name,
            username,
            email,
            password_hash,
            profile_kind,
            features: req
                .features
                .unwrap_or_else(|| FeatureToggles::preset_for(profile_kind)),
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, profile = profile_kind.as_str(), "User registered");
    state.audit(user.id, "Registered account").await;

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret())?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: ProfileResponse::from(user),
            tokens,
        }),
    ))
}

/// Login
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/login
/// Content-Type: application/json
///
/// { "email": "sam@example.com", "password": "focus2024" }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "user": { "id": "uuid", "username": "samr", ... },
///   "access_token": "eyJ...",
///   "refresh_token": "eyJ...",
///   "token_type": "Bearer",
///   "expires_in": 86400
/// }
/// ```
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Malformed email
/// - `401 Unauthorized`: Unknown email or wrong password (indistinguishable)
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = User::find_by_email(&state.db, &normalize_email(&req.email))
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(invalid());
    }

    User::update_last_login(&state.db, user.id).await?;
    state.audit(user.id, "Logged in").await;

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret())?;

    Ok(Json(AuthResponse {
        user: ProfileResponse::from(user),
        tokens,
    }))
}

/// Token refresh
///
/// # Endpoint
///
/// ```text
/// POST /v1/auth/refresh
///
/// { "refresh_token": "eyJ..." }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid, expired or non-refresh token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(Json(RefreshResponse { access_token }))
}

/// Logout
///
/// Tokens are not tracked server side; the client discards them. The call
/// only records the action.
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> StatusCode {
    state.audit(auth.user_id, "Logged out").await;
    StatusCode::NO_CONTENT
}
