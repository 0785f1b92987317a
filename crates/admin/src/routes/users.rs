//! User registry routes: listing, sync and record updates.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State, multipart::MultipartError},
    http::StatusCode,
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};
use supernova_core::{User, UserId, UserUpdate};
use tracing::instrument;

use crate::error::AppError;
use crate::middleware::RequireSuperAdmin;
use crate::registry::ImageUpload;
use crate::services::{SyncStatus, UserEditor};
use crate::state::AppState;

/// Largest accepted edit form, profile image included.
pub const MAX_UPDATE_BYTES: usize = 10 * 1024 * 1024;

/// Build the users router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list_users))
        .route("/api/users/sync", post(sync_users))
        .route(
            "/api/users/{id}",
            patch(update_user).layer(DefaultBodyLimit::max(MAX_UPDATE_BYTES)),
        )
}

// =============================================================================
// Types
// =============================================================================

/// Search parameters.
#[derive(Debug, Default, Deserialize)]
pub struct UsersQuery {
    #[serde(default)]
    pub q: Option<String>,
}

/// A user as shown in the registry table.
#[derive(Debug, Serialize)]
pub struct UserRow {
    #[serde(flatten)]
    pub user: User,
    pub initials: String,
    /// Join date, e.g. `Oct 1, 2023`.
    pub joined: String,
}

impl From<User> for UserRow {
    fn from(user: User) -> Self {
        Self {
            initials: user.initials(),
            joined: user.created_at.format("%b %-d, %Y").to_string(),
            user,
        }
    }
}

/// Registry table payload.
#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserRow>,
    pub sync: SyncStatus,
}

/// Successful update.
#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub user: User,
    pub sync: SyncStatus,
}

// =============================================================================
// Handlers
// =============================================================================

/// Cached users, optionally filtered by name or phone.
#[instrument(skip(_session, state))]
async fn list_users(
    RequireSuperAdmin(_session): RequireSuperAdmin,
    State(state): State<AppState>,
    Query(query): Query<UsersQuery>,
) -> Json<UsersResponse> {
    let users = state.sync().search(query.q.as_deref().unwrap_or_default()).await;

    Json(UsersResponse {
        users: users.into_iter().map(UserRow::from).collect(),
        sync: state.sync().status().await,
    })
}

/// Re-fetch the registry.
#[instrument(skip(_session, state))]
async fn sync_users(
    RequireSuperAdmin(_session): RequireSuperAdmin,
    State(state): State<AppState>,
) -> Result<Json<UsersResponse>, AppError> {
    let users = state.sync_now().await?;

    Ok(Json(UsersResponse {
        users: users.iter().cloned().map(UserRow::from).collect(),
        sync: state.sync().status().await,
    }))
}

/// Submit a multipart edit, then re-fetch the registry.
///
/// Text parts use the registry's camelCase field names; the image goes in
/// the `file` part. Blank values are not sent. A form with nothing to
/// send is rejected before the registry is called.
#[instrument(skip(session, state, multipart), fields(user_id = %id))]
async fn update_user(
    RequireSuperAdmin(session): RequireSuperAdmin,
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<UpdateResponse>, AppError> {
    let (update, image) = read_update_form(multipart).await?;
    if update.is_empty() && image.is_none() {
        return Err(AppError::BadRequest("Nothing to update".to_string()));
    }
    let id = UserId::new(id);

    let user = UserEditor::new(state.registry())
        .update(Some(&session.token), &id, &update, image)
        .await?;

    if let Err(e) = state.sync_now().await {
        tracing::warn!(error = %e, "Re-fetch after update failed");
    }

    Ok(Json(UpdateResponse {
        user,
        sync: state.sync().status().await,
    }))
}

async fn read_update_form(
    mut multipart: Multipart,
) -> Result<(UserUpdate, Option<ImageUpload>), AppError> {
    let bad_form = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(format!(
                "Upload exceeds {} MiB",
                MAX_UPDATE_BYTES / (1024 * 1024)
            ))
        } else {
            AppError::BadRequest(e.body_text())
        }
    };
    let mut update = UserUpdate::default();
    let mut image = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "file" {
            let file_name = field.file_name().unwrap_or("upload").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await.map_err(bad_form)?;
            if !bytes.is_empty() {
                image = Some(ImageUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let value = field.text().await.map_err(bad_form)?;
        apply_field(&mut update, &name, value)?;
    }

    Ok((update, image))
}

fn apply_field(update: &mut UserUpdate, name: &str, value: String) -> Result<(), AppError> {
    let invalid = AppError::BadRequest;
    let trimmed = value.trim();

    match name {
        "name" => update.name = Some(value),
        "bio" => update.bio = Some(value),
        "about" => update.about = Some(value),
        "website" => update.website = Some(value),
        "location" => update.location = Some(value),
        "permanentAddress" => update.permanent_address = Some(value),
        _ if trimmed.is_empty() => {}
        "role" => update.role = Some(trimmed.parse().map_err(invalid)?),
        "gender" => update.gender = Some(trimmed.parse().map_err(invalid)?),
        "bloodGroup" => update.blood_group = Some(trimmed.parse().map_err(invalid)?),
        other => tracing::debug!(field = other, "Ignoring unknown form field"),
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, header};
    use secrecy::SecretString;
    use supernova_core::{BloodGroup, UserRole};

    use super::*;
    use crate::routes::routes;
    use crate::routes::test_support::{offline_state, send};
    use crate::services::testing::user;
    use crate::session::Session;

    fn operator() -> Session {
        Session {
            token: SecretString::from("tok-123"),
            user: user("u-2", "777", Some(UserRole::SuperAdmin)),
        }
    }

    fn edit_form(parts: &[(&str, Option<&str>, Vec<u8>)]) -> Request<Body> {
        let mut body = Vec::new();
        for (name, file_name, bytes) in parts {
            body.extend_from_slice(b"--X\r\n");
            match file_name {
                Some(file_name) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: image/png\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(b"--X--\r\n");

        Request::patch("/api/users/u-1")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=X")
            .body(Body::from(body))
            .unwrap()
    }

    #[test]
    fn test_user_row_formatting() {
        let mut record = user("u-1", "555", Some(UserRole::User));
        record.name = "Alex Rivera".to_string();
        record.created_at = "2023-10-01T12:00:00Z".parse().unwrap();

        let row = serde_json::to_value(UserRow::from(record)).unwrap();
        assert_eq!(row["initials"], "AR");
        assert_eq!(row["joined"], "Oct 1, 2023");
        assert_eq!(row["_id"], "u-1");
        assert_eq!(row["phone"], "555");
    }

    #[test]
    fn test_apply_field() {
        let mut update = UserUpdate::default();
        apply_field(&mut update, "name", "Alex".to_string()).unwrap();
        apply_field(&mut update, "role", "admin".to_string()).unwrap();
        apply_field(&mut update, "bloodGroup", "B-".to_string()).unwrap();
        apply_field(&mut update, "gender", String::new()).unwrap();
        apply_field(&mut update, "favouriteColour", "teal".to_string()).unwrap();

        assert_eq!(update.name.as_deref(), Some("Alex"));
        assert_eq!(update.role, Some(UserRole::Admin));
        assert_eq!(update.blood_group, Some(BloodGroup::BNegative));
        assert_eq!(update.gender, None);

        let err = apply_field(&mut update, "role", "root".to_string()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_users_require_session() {
        let app = routes().with_state(offline_state(None));
        let request = Request::patch("/api/users/u-1")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=X")
            .body(Body::from("--X--\r\n"))
            .unwrap();
        let (status, _) = send(app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let app = routes().with_state(offline_state(None));
        let (status, _) = send(app, Request::get("/api/users?q=a").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_empty_edit_is_rejected() {
        let app = routes().with_state(offline_state(Some(operator())));
        let form = edit_form(&[("favouriteColour", None, b"teal".to_vec())]);
        let (status, body) = send(app, form).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Nothing to update");

        // Blank enum parts are skipped, so they count as nothing too.
        let app = routes().with_state(offline_state(Some(operator())));
        let (status, _) = send(app, edit_form(&[("gender", None, Vec::new())])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_image_over_default_limit_reaches_registry() {
        // Past axum's 2 MiB default, under the route's own limit. The
        // registry is offline, so getting that far means a 502.
        let image = vec![0x89; 3 * 1024 * 1024];
        let app = routes().with_state(offline_state(Some(operator())));
        let (status, _) = send(app, edit_form(&[("file", Some("avatar.png"), image)])).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_image_over_route_limit_is_rejected() {
        let image = vec![0x89; MAX_UPDATE_BYTES + 1];
        let app = routes().with_state(offline_state(Some(operator())));
        let (status, body) = send(app, edit_form(&[("file", Some("avatar.png"), image)])).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "Upload exceeds 10 MiB");
    }
}
