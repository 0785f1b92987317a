//! HTTP route handlers for admin.
//!
//! # Route Structure
//!
//! ```text
//! GET   /health             - Liveness check
//!
//! # Auth
//! GET   /auth/session       - Current session
//! POST  /auth/login         - Role-gated login, then sync
//! POST  /auth/logout        - Logout (idempotent)
//!
//! # Dashboard (session required)
//! GET   /api/dashboard      - Stat cards, 7-day chart, sync status
//!
//! # Users (session required)
//! GET   /api/users?q=       - Cached user rows, filtered
//! POST  /api/users/sync     - Re-fetch the registry
//! PATCH /api/users/{id}     - Multipart partial update, then re-fetch
//!                             (body limit 10 MiB, image included)
//!
//! # Assistant (session required)
//! GET   /api/assistant      - Greeting
//! POST  /api/assistant      - Ask a question
//! ```

pub mod assistant;
pub mod auth;
pub mod dashboard;
pub mod users;

use axum::{Router, routing::get};

use crate::state::AppState;

/// Build the complete router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .merge(auth::router())
        .merge(dashboard::router())
        .merge(users::router())
        .merge(assistant::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the registry.
async fn health() -> &'static str {
    "ok"
}
