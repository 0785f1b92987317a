//! Persisted operator session.
//!
//! The session is the `{token, user}` pair written after a role-gated login.
//! It is read once at startup and owned by the auth gate afterwards.

mod file;

pub use file::FileSessionStore;

use std::sync::Mutex;

use secrecy::SecretString;
use supernova_core::User;
use thiserror::Error;

/// Errors raised by a [`SessionStore`].
#[derive(Debug, Error)]
pub enum SessionStoreError {
    /// Reading or writing the backing file failed.
    #[error("session I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored session could not be encoded or decoded.
    #[error("session encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// An authenticated operator: the bearer token and the verified profile.
#[derive(Clone)]
pub struct Session {
    pub token: SecretString,
    pub user: User,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token", &"[REDACTED]")
            .field("user", &self.user.id)
            .finish()
    }
}

/// Storage for the single operator session.
///
/// Calls are short and synchronous; they run inside request handlers.
pub trait SessionStore: Send + Sync {
    /// Read the stored session. A partial or unreadable user snapshot loads
    /// as `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn load(&self) -> Result<Option<Session>, SessionStoreError>;

    /// Replace the stored session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    fn save(&self, session: &Session) -> Result<(), SessionStoreError>;

    /// Remove the stored session. Clearing an empty store succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if existing storage cannot be removed.
    fn clear(&self) -> Result<(), SessionStoreError>;
}

/// In-memory store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    /// A store that starts out holding `session`.
    #[must_use]
    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.session
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>, SessionStoreError> {
        Ok(self.slot().clone())
    }

    fn save(&self, session: &Session) -> Result<(), SessionStoreError> {
        *self.slot() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionStoreError> {
        *self.slot() = None;
        Ok(())
    }
}
