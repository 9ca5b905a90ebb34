/// Custom middleware for the API server
///
/// The JWT layer lives in `app` because it needs `AppState`; request tracing,
/// CORS and compression come from `tower-http`.

pub mod security;
