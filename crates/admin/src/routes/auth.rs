//! Operator login, logout and session status.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use supernova_core::{Phone, User};
use tracing::instrument;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::services::SyncStatus;
use crate::state::AppState;

/// Build the auth router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/session", get(session))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

// =============================================================================
// Types
// =============================================================================

/// Login form.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub phone: String,
    pub password: String,
}

/// Current session as seen by the console.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub authenticated: bool,
    pub state: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

/// Successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub sync: SyncStatus,
}

// =============================================================================
// Handlers
// =============================================================================

/// Report whether an operator is logged in.
#[instrument(skip(state))]
async fn session(State(state): State<AppState>) -> Json<SessionResponse> {
    let auth_state = state.auth().state().await;
    let user = state.auth().session().await.map(|session| session.user);

    Json(SessionResponse {
        authenticated: user.is_some(),
        state: auth_state.as_str(),
        user,
    })
}

/// Log in, then load the registry.
///
/// A failed initial sync does not fail the login; it shows in `sync`.
#[instrument(skip(state, body))]
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let phone = Phone::parse(&body.phone).map_err(|e| AppError::BadRequest(e.to_string()))?;
    if body.password.is_empty() {
        return Err(AppError::BadRequest("Password is required".to_string()));
    }
    let password = SecretString::from(body.password);

    let session = state.auth().login(&phone, &password).await?;
    set_sentry_user(&session.user.id, &session.user.name);

    if let Err(e) = state.sync().fetch_all(Some(&session.token)).await {
        tracing::warn!(error = %e, "Initial sync after login failed");
    }

    Ok(Json(LoginResponse {
        user: session.user,
        sync: state.sync().status().await,
    }))
}

/// Log out and drop the cached registry. Idempotent.
#[instrument(skip(state))]
async fn logout(State(state): State<AppState>) -> StatusCode {
    state.auth().logout().await;
    state.sync().reset().await;
    clear_sentry_user();
    StatusCode::NO_CONTENT
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, header};
    use secrecy::SecretString;
    use supernova_core::UserRole;

    use super::*;
    use crate::routes::routes;
    use crate::routes::test_support::{offline_state, send};
    use crate::services::testing::user;
    use crate::session::Session;

    fn login_request(json: &str) -> Request<Body> {
        Request::post("/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_session_when_logged_out() {
        let app = routes().with_state(offline_state(None));
        let (status, body) = send(app, Request::get("/auth/session").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["authenticated"], false);
        assert_eq!(body["state"], "logged_out");
        assert!(body.get("user").is_none());
    }

    #[tokio::test]
    async fn test_session_restored_from_store() {
        let session = Session {
            token: SecretString::from("tok-123"),
            user: user("u-2", "777", Some(UserRole::SuperAdmin)),
        };
        let app = routes().with_state(offline_state(Some(session)));
        let (_, body) = send(app, Request::get("/auth/session").body(Body::empty()).unwrap()).await;
        assert_eq!(body["authenticated"], true);
        assert_eq!(body["user"]["_id"], "u-2");
    }

    #[tokio::test]
    async fn test_login_rejects_malformed_phone() {
        let app = routes().with_state(offline_state(None));
        let (status, body) = send(app, login_request(r#"{"phone":"call me","password":"pw"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_login_requires_password() {
        let app = routes().with_state(offline_state(None));
        let (status, body) = send(app, login_request(r#"{"phone":"555","password":""}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Password is required");
    }

    #[tokio::test]
    async fn test_login_with_unreachable_registry() {
        let app = routes().with_state(offline_state(None));
        let (status, body) = send(app, login_request(r#"{"phone":"555","password":"pw"}"#)).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(
            body["error"],
            "Connection failed. Please check your internet or API status."
        );
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let state = offline_state(None);
        for _ in 0..2 {
            let app = routes().with_state(state.clone());
            let (status, _) = send(app, Request::post("/auth/logout").body(Body::empty()).unwrap()).await;
            assert_eq!(status, StatusCode::NO_CONTENT);
        }
        assert!(state.auth().session().await.is_none());
    }
}
