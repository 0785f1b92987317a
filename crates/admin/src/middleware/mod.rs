//! Middleware and extractors for admin.

pub mod auth;

pub use auth::{RequireSuperAdmin, SessionRejection};
