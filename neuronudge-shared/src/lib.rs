//! # Neuronudge Shared Library
//!
//! Types, storage access and business logic used by the Neuronudge API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their queries
//! - `auth`: Password hashing, tokens, request authentication, ownership checks
//! - `db`: Connection pool and migrations
//! - `due_date`: Reference-timezone due date normalization
//! - `dashboard`: Dashboard counts, filters, ordering and pagination

pub mod auth;
pub mod dashboard;
pub mod db;
pub mod due_date;
pub mod models;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
