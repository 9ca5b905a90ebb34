/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use neuronudge_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = build_router(AppState::new(pool, config)?);
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer, routes};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use neuronudge_shared::{
    auth::middleware::authenticate, due_date::DueDateNormalizer, models::activity_log::ActivityLog,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use uuid::Uuid;

/// Room for multipart framing on top of the avatar bytes
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,

    /// Reference-timezone due date conversion
    pub normalizer: DueDateNormalizer,
}

impl AppState {
    /// # Errors
    ///
    /// Returns an error if the configured reference offset is invalid
    pub fn new(db: PgPool, config: Config) -> anyhow::Result<Self> {
        let normalizer = config.tasks.normalizer()?;

        Ok(Self {
            db,
            config: Arc::new(config),
            normalizer,
        })
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }

    /// Reads the clock; handlers call this once per request and pass the
    /// instant to the pure due-date and dashboard functions
    pub fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    /// Records a user action in the activity log
    ///
    /// A failed insert is logged and otherwise ignored.
    pub async fn audit(&self, user_id: Uuid, action: impl AsRef<str>) {
        let action = action.as_ref();
        tracing::info!(target: "neuronudge::audit", %user_id, action);

        if let Err(e) = ActivityLog::record(&self.db, user_id, action).await {
            tracing::warn!(%user_id, error = %e, "Failed to persist activity log entry");
        }
    }
}

/// Builds the complete router
///
/// ```text
/// /
/// ├── GET  /health
/// ├── /uploads/*                       # avatar files (read-only)
/// └── /v1/
///     ├── /auth/  POST register, login, refresh    (public)
///     │           POST logout                      (authenticated)
///     ├── GET     /dashboard
///     ├── /tasks/ GET, POST
///     │   ├── GET, PUT, DELETE /:id
///     │   ├── POST /:id/complete, /:id/reminder
///     │   ├── POST /bulk-complete, /bulk-delete, /search
///     │   └── GET  /export
///     ├── /profile/ GET, PUT; POST /password, /avatar
///     ├── /preferences GET, PUT
///     └── GET /activity
/// ```
///
/// Middleware, outermost first: security headers, CORS, tracing, compression,
/// then JWT authentication on every `/v1` route except the public auth
/// endpoints.
pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh));

    let avatar_limit = state.config.uploads.max_avatar_bytes + MULTIPART_OVERHEAD_BYTES;

    let protected_routes = Router::new()
        .route("/auth/logout", post(routes::auth::logout))
        .route("/dashboard", get(routes::dashboard::dashboard))
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route("/tasks/export", get(routes::tasks::export_tasks))
        .route("/tasks/search", post(routes::tasks::search_tasks))
        .route("/tasks/bulk-complete", post(routes::tasks::bulk_complete))
        .route("/tasks/bulk-delete", post(routes::tasks::bulk_delete))
        .route(
            "/tasks/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/tasks/:id/complete", post(routes::tasks::toggle_complete))
        .route("/tasks/:id/reminder", post(routes::tasks::toggle_reminder))
        .route(
            "/profile",
            get(routes::profile::get_profile).put(routes::profile::update_profile),
        )
        .route("/profile/password", post(routes::profile::change_password))
        .route(
            "/profile/avatar",
            post(routes::profile::upload_avatar).layer(DefaultBodyLimit::max(avatar_limit)),
        )
        .route(
            "/preferences",
            get(routes::preferences::get_preferences).put(routes::preferences::update_preferences),
        )
        .route("/activity", get(routes::activity::list_activity))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_auth_layer));

    let v1_routes = public_routes.merge(protected_routes);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/v1", v1_routes)
        .nest_service("/uploads", ServeDir::new(&state.config.uploads.dir))
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

/// Validates the bearer token and injects `AuthContext`
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = authenticate(req.headers(), state.jwt_secret())?;
    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}
