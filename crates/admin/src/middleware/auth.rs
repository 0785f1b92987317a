//! Authentication extractor for admin.
//!
//! The console serves a single operator session held by the auth gate; API
//! routes require it to be `Authenticated`.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};

use crate::error::ErrorBody;
use crate::session::Session;
use crate::state::AppState;

/// Extractor that requires an authenticated super-admin session.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireSuperAdmin(session): RequireSuperAdmin,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", session.user.name)
/// }
/// ```
pub struct RequireSuperAdmin(pub Session);

/// Error returned when a route requires a session and none is active.
#[derive(Debug)]
pub enum SessionRejection {
    /// No operator is logged in.
    NotLoggedIn,
}

impl IntoResponse for SessionRejection {
    fn into_response(self) -> Response {
        match self {
            Self::NotLoggedIn => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorBody {
                    error: "Not logged in".to_string(),
                }),
            )
                .into_response(),
        }
    }
}

impl FromRequestParts<AppState> for RequireSuperAdmin {
    type Rejection = SessionRejection;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = state
            .auth()
            .session()
            .await
            .filter(|session| session.user.is_privileged())
            .ok_or(SessionRejection::NotLoggedIn)?;

        Ok(Self(session))
    }
}
