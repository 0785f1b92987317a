//! Record update: partial edits submitted to the registry.

use secrecy::SecretString;
use supernova_core::{User, UserId, UserUpdate};
use thiserror::Error;
use tracing::instrument;

use crate::registry::{ImageUpload, RegistryApi};

const UPDATE_FAILED: &str = "Update failed";
const CONNECTION_FAILED: &str = "Connection failed. Please check your internet or API status.";

/// Why an update failed. Display strings are shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateError {
    /// The registry rejected the update.
    #[error("{0}")]
    ValidationError(String),

    /// Transport failure or unparseable response.
    #[error("{0}")]
    NetworkError(String),

    /// No operator token is available.
    #[error("Not logged in")]
    Unauthorized,
}

/// Submits user edits on behalf of the logged-in operator.
///
/// Does not touch the cached collection; callers re-fetch on success.
pub struct UserEditor<'a, R> {
    registry: &'a R,
}

impl<'a, R: RegistryApi> UserEditor<'a, R> {
    #[must_use]
    pub const fn new(registry: &'a R) -> Self {
        Self { registry }
    }

    /// Send the non-empty fields of `update`, plus an optional image.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Unauthorized`] without a token,
    /// [`UpdateError::ValidationError`] when the registry rejects the edit and
    /// [`UpdateError::NetworkError`] when it cannot be reached.
    #[instrument(skip(self, token, update, image), fields(user_id = %id))]
    pub async fn update(
        &self,
        token: Option<&SecretString>,
        id: &UserId,
        update: &UserUpdate,
        image: Option<ImageUpload>,
    ) -> Result<User, UpdateError> {
        let token = token.ok_or(UpdateError::Unauthorized)?;

        let response = self
            .registry
            .update_user(token, id, update, image)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Update request failed");
                UpdateError::NetworkError(CONNECTION_FAILED.to_string())
            })?;

        if !response.success {
            return Err(UpdateError::ValidationError(
                response.message_or(UPDATE_FAILED).to_string(),
            ));
        }

        let user = response.data.ok_or_else(|| {
            UpdateError::NetworkError("Unexpected response from the registry.".to_string())
        })?;
        tracing::info!("User updated");
        Ok(user)
    }
}
