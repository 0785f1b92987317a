//! Remote user registry (REST) integration.
//!
//! The registry owns every user record; this crate only reads the full
//! collection, logs operators in and submits partial updates.
//!
//! # Endpoints
//!
//! - `POST /api/v1/auth/login/` - `{phone, password}` → `{accessToken}`
//! - `GET /api/v1/users/` - full user list (bearer auth)
//! - `PATCH /api/v1/users/update-user/{id}` - multipart partial update (bearer auth)
//!
//! Every endpoint answers with the `{success, message, data}` envelope.

mod client;
mod error;
mod types;

pub use client::RegistryClient;
pub use error::RegistryError;
pub use types::{ApiResponse, ImageUpload, LoginData, LoginRequest};

use std::future::Future;
use std::sync::Arc;

use secrecy::SecretString;
use supernova_core::{User, UserId, UserUpdate};

/// Operations the dashboard needs from the registry.
///
/// Implementations return the decoded envelope and leave the meaning of
/// `success == false` to the caller; only transport and decoding failures
/// are errors here.
pub trait RegistryApi: Send + Sync {
    /// Exchange credentials for an access token.
    ///
    /// The envelope is decoded whatever the HTTP status.
    fn login(
        &self,
        phone: &str,
        password: &SecretString,
    ) -> impl Future<Output = Result<ApiResponse<LoginData>, RegistryError>> + Send;

    /// Fetch the full user collection.
    ///
    /// A non-success HTTP status is a [`RegistryError::Status`].
    fn list_users(
        &self,
        token: &SecretString,
    ) -> impl Future<Output = Result<ApiResponse<Vec<User>>, RegistryError>> + Send;

    /// Submit a partial update, with an optional profile image.
    ///
    /// The envelope is decoded whatever the HTTP status, so validation
    /// messages reach the caller.
    fn update_user(
        &self,
        token: &SecretString,
        id: &UserId,
        update: &UserUpdate,
        image: Option<ImageUpload>,
    ) -> impl Future<Output = Result<ApiResponse<User>, RegistryError>> + Send;
}

impl<T: RegistryApi> RegistryApi for Arc<T> {
    fn login(
        &self,
        phone: &str,
        password: &SecretString,
    ) -> impl Future<Output = Result<ApiResponse<LoginData>, RegistryError>> + Send {
        (**self).login(phone, password)
    }

    fn list_users(
        &self,
        token: &SecretString,
    ) -> impl Future<Output = Result<ApiResponse<Vec<User>>, RegistryError>> + Send {
        (**self).list_users(token)
    }

    fn update_user(
        &self,
        token: &SecretString,
        id: &UserId,
        update: &UserUpdate,
        image: Option<ImageUpload>,
    ) -> impl Future<Output = Result<ApiResponse<User>, RegistryError>> + Send {
        (**self).update_user(token, id, update, image)
    }
}
