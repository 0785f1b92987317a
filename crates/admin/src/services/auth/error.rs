//! Auth gate error types.

use thiserror::Error;

use crate::session::SessionStoreError;

/// Why a login attempt failed.
///
/// Display strings are shown to the operator verbatim.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The registry rejected the credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// The token is valid but no registry entry carries the submitted phone.
    #[error("User profile could not be verified in the database.")]
    ProfileNotFound,

    /// The profile exists but does not hold the privileged role.
    #[error("Access Denied: Your account role ({role}) does not have SuperAdmin privileges.")]
    RoleDenied {
        /// The role the profile actually holds (`none` when absent).
        role: String,
    },

    /// The registry could not be reached or answered with garbage.
    #[error("{0}")]
    NetworkError(String),

    /// The verified session could not be persisted.
    #[error("session storage failed: {0}")]
    Store(#[from] SessionStoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_messages() {
        let err = AuthError::RoleDenied {
            role: "user".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Access Denied: Your account role (user) does not have SuperAdmin privileges."
        );
        assert_eq!(
            AuthError::ProfileNotFound.to_string(),
            "User profile could not be verified in the database."
        );
        assert_eq!(
            AuthError::Unauthorized("Invalid credentials".to_string()).to_string(),
            "Invalid credentials"
        );
    }
}
