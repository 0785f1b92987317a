//! Unified error handling for admin.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use supernova_core::UserId;
use thiserror::Error;

use crate::services::{AuthError, SyncError, UpdateError};

/// Application-level error type for the admin API.
///
/// Component errors keep their own display text; it is what the operator
/// sees.
#[derive(Debug, Error)]
pub enum AppError {
    /// Login failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Registry fetch failed.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Record update failed.
    #[error(transparent)]
    Update(#[from] UpdateError),

    /// Bad request from client.
    #[error("{0}")]
    BadRequest(String),

    /// Request body over the route's limit.
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Auth(err) => match err {
                AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                AuthError::ProfileNotFound | AuthError::RoleDenied { .. } => StatusCode::FORBIDDEN,
                AuthError::NetworkError(_) => StatusCode::BAD_GATEWAY,
                AuthError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Sync(err) => match err {
                SyncError::Unauthorized => StatusCode::UNAUTHORIZED,
                SyncError::Unreachable | SyncError::ServerError(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Update(err) => match err {
                UpdateError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
                UpdateError::NetworkError(_) => StatusCode::BAD_GATEWAY,
                UpdateError::Unauthorized => StatusCode::UNAUTHORIZED,
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn is_server_fault(&self) -> bool {
        matches!(self, Self::Internal(_) | Self::Auth(AuthError::Store(_)))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if self.is_server_fault() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Admin request error"
            );
        }

        // Don't expose internal error details to clients
        let message = if self.is_server_fault() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (self.status(), Json(ErrorBody { error: message })).into_response()
    }
}

/// Set the Sentry user context from the logged-in operator.
pub fn set_sentry_user(user_id: &UserId, name: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: Some(name.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
