//! Auth gate: role-gated operator login and the session state machine.
//!
//! ```text
//! LoggedOut --login--> Authenticating --ok--> Authenticated
//!                            |                     |
//!                            +--failure--> LoggedOut <--logout--+
//! ```
//!
//! The gate is the only owner of the [`SessionStore`]; the persisted session
//! always mirrors the in-memory state.

mod error;

pub use error::AuthError;

use std::sync::Arc;

use secrecy::SecretString;
use supernova_core::{Phone, User};
use tokio::sync::RwLock;
use tracing::instrument;

use crate::registry::RegistryApi;
use crate::session::{Session, SessionStore};

const LOGIN_FAILED: &str = "Login failed";
const CONNECTION_FAILED: &str = "Connection failed. Please check your internet or API status.";

/// Gate state.
#[derive(Debug, Clone, Default)]
pub enum AuthState {
    #[default]
    LoggedOut,
    Authenticating,
    Authenticated(Session),
}

impl AuthState {
    /// Short name for logs and status payloads.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::LoggedOut => "logged_out",
            Self::Authenticating => "authenticating",
            Self::Authenticated(_) => "authenticated",
        }
    }
}

/// Role-gated login against the registry.
pub struct AuthGate<R> {
    registry: R,
    store: Arc<dyn SessionStore>,
    state: RwLock<AuthState>,
}

impl<R: RegistryApi> AuthGate<R> {
    /// Create the gate, starting `Authenticated` when the store holds a
    /// session.
    ///
    /// An unreadable store is treated as logged out.
    pub fn new(registry: R, store: Arc<dyn SessionStore>) -> Self {
        let state = match store.load() {
            Ok(Some(session)) => {
                tracing::info!(user_id = %session.user.id, "Restored persisted session");
                AuthState::Authenticated(session)
            }
            Ok(None) => AuthState::LoggedOut,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable session store");
                AuthState::LoggedOut
            }
        };

        Self {
            registry,
            store,
            state: RwLock::new(state),
        }
    }

    /// Snapshot of the current state.
    pub async fn state(&self) -> AuthState {
        self.state.read().await.clone()
    }

    /// The active session, if authenticated.
    pub async fn session(&self) -> Option<Session> {
        match &*self.state.read().await {
            AuthState::Authenticated(session) => Some(session.clone()),
            AuthState::LoggedOut | AuthState::Authenticating => None,
        }
    }

    /// The active bearer token, if authenticated.
    pub async fn token(&self) -> Option<SecretString> {
        self.session().await.map(|session| session.token)
    }

    /// Log in and persist the session.
    ///
    /// Succeeds only when the registry accepts the credentials, a registry
    /// entry carries exactly `phone`, and that entry holds the privileged
    /// role. Any failure leaves the gate `LoggedOut` with the store cleared,
    /// including when a previous session was active.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as an [`AuthError`].
    #[instrument(skip(self, password), fields(phone = %phone))]
    pub async fn login(&self, phone: &Phone, password: &SecretString) -> Result<Session, AuthError> {
        *self.state.write().await = AuthState::Authenticating;

        let result = match self.verify(phone, password).await {
            Ok(session) => self.store.save(&session).map(|()| session).map_err(AuthError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(session) => {
                tracing::info!(user_id = %session.user.id, "Operator logged in");
                *self.state.write().await = AuthState::Authenticated(session.clone());
                Ok(session)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Login rejected");
                self.reset().await;
                Err(e)
            }
        }
    }

    /// Clear the session. Idempotent; never fails.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        self.reset().await;
        tracing::info!("Operator logged out");
    }

    async fn reset(&self) {
        if let Err(e) = self.store.clear() {
            let event_id = sentry::capture_error(&e);
            tracing::error!(error = %e, sentry_event_id = %event_id, "Failed to clear session store");
        }
        *self.state.write().await = AuthState::LoggedOut;
    }

    async fn verify(&self, phone: &Phone, password: &SecretString) -> Result<Session, AuthError> {
        let response = self
            .registry
            .login(phone.as_str(), password)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Login request failed");
                AuthError::NetworkError(CONNECTION_FAILED.to_string())
            })?;

        if !response.success {
            return Err(AuthError::Unauthorized(
                response.message_or(LOGIN_FAILED).to_string(),
            ));
        }
        let Some(data) = response.data else {
            return Err(AuthError::Unauthorized(LOGIN_FAILED.to_string()));
        };
        let token = SecretString::from(data.access_token);

        let user = self.find_profile(&token, phone).await?;
        if !user.is_privileged() {
            return Err(AuthError::RoleDenied {
                role: user.role_label().to_string(),
            });
        }

        Ok(Session { token, user })
    }

    async fn find_profile(&self, token: &SecretString, phone: &Phone) -> Result<User, AuthError> {
        let response = self.registry.list_users(token).await.map_err(|e| {
            tracing::warn!(error = %e, "Profile verification fetch failed");
            AuthError::NetworkError(CONNECTION_FAILED.to_string())
        })?;

        if !response.success {
            return Err(AuthError::NetworkError(
                response.message_or(CONNECTION_FAILED).to_string(),
            ));
        }

        response
            .data
            .unwrap_or_default()
            .into_iter()
            .find(|user| user.phone == phone.as_str())
            .ok_or(AuthError::ProfileNotFound)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;
    use supernova_core::UserRole;

    use super::*;
    use crate::registry::LoginData;
    use crate::services::testing::{FakeRegistry, failed, ok, user};
    use crate::session::{MemorySessionStore, SessionStoreError};

    fn phone(raw: &str) -> Phone {
        Phone::parse(raw).unwrap()
    }

    fn password() -> SecretString {
        SecretString::from("correct-horse")
    }

    fn new_gate(registry: Arc<FakeRegistry>) -> (AuthGate<Arc<FakeRegistry>>, Arc<MemorySessionStore>) {
        let store = Arc::new(MemorySessionStore::default());
        (AuthGate::new(registry, store.clone()), store)
    }

    fn admin_registry() -> Arc<FakeRegistry> {
        FakeRegistry::with_users(vec![
            user("u-1", "555", Some(UserRole::User)),
            user("u-2", "777", Some(UserRole::SuperAdmin)),
            user("u-3", "888", None),
        ])
    }

    #[tokio::test]
    async fn test_login_success_persists_session() {
        let registry = admin_registry();
        let (gate, store) = new_gate(registry.clone());

        let session = gate.login(&phone("777"), &password()).await.unwrap();
        assert_eq!(session.user.id.as_str(), "u-2");
        assert_eq!(session.token.expose_secret(), "tok-123");

        assert!(matches!(gate.state().await, AuthState::Authenticated(_)));
        assert_eq!(store.load().unwrap().unwrap().user.id.as_str(), "u-2");
        assert_eq!(registry.tokens_seen.lock().unwrap().as_slice(), ["tok-123"]);
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let registry = admin_registry();
        *registry.login.lock().unwrap() = Some(failed("Invalid phone or password"));
        let (gate, store) = new_gate(registry.clone());

        let err = gate.login(&phone("777"), &password()).await.unwrap_err();
        assert!(matches!(err, AuthError::Unauthorized(ref m) if m == "Invalid phone or password"));
        assert!(matches!(gate.state().await, AuthState::LoggedOut));
        assert!(store.load().unwrap().is_none());
        assert_eq!(registry.list_calls(), 0);
    }

    #[tokio::test]
    async fn test_rejected_credentials_without_message() {
        let registry = admin_registry();
        *registry.login.lock().unwrap() = Some(failed(""));
        let (gate, _) = new_gate(registry);

        let err = gate.login(&phone("777"), &password()).await.unwrap_err();
        assert_eq!(err.to_string(), "Login failed");
    }

    #[tokio::test]
    async fn test_profile_not_found() {
        let (gate, _) = new_gate(admin_registry());
        let err = gate.login(&phone("999"), &password()).await.unwrap_err();
        assert!(matches!(err, AuthError::ProfileNotFound));
        assert!(gate.session().await.is_none());
    }

    #[tokio::test]
    async fn test_role_denied_carries_actual_role() {
        let registry = FakeRegistry::with_users(vec![user("u-1", "555", Some(UserRole::User))]);
        let (gate, store) = new_gate(registry);

        let err = gate.login(&phone("555"), &password()).await.unwrap_err();
        assert!(matches!(err, AuthError::RoleDenied { ref role } if role == "user"));
        assert!(err.to_string().contains("(user)"));
        assert!(store.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_role_is_denied_as_none() {
        let (gate, _) = new_gate(admin_registry());
        let err = gate.login(&phone("888"), &password()).await.unwrap_err();
        assert!(matches!(err, AuthError::RoleDenied { ref role } if role == "none"));
    }

    #[tokio::test]
    async fn test_network_failures() {
        let registry = admin_registry();
        *registry.login.lock().unwrap() = None;
        let (gate, _) = new_gate(registry.clone());
        let err = gate.login(&phone("777"), &password()).await.unwrap_err();
        assert!(matches!(err, AuthError::NetworkError(_)));

        *registry.login.lock().unwrap() = Some(ok(LoginData {
            access_token: "tok-123".to_string(),
        }));
        *registry.users.lock().unwrap() = None;
        let err = gate.login(&phone("777"), &password()).await.unwrap_err();
        assert!(matches!(err, AuthError::NetworkError(_)));
    }

    #[tokio::test]
    async fn test_failed_relogin_clears_previous_session() {
        let registry = admin_registry();
        let (gate, store) = new_gate(registry.clone());
        gate.login(&phone("777"), &password()).await.unwrap();

        *registry.login.lock().unwrap() = Some(failed("Session expired"));
        gate.login(&phone("777"), &password()).await.unwrap_err();

        assert!(matches!(gate.state().await, AuthState::LoggedOut));
        assert!(store.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_logout_is_idempotent() {
        let (gate, store) = new_gate(admin_registry());
        gate.login(&phone("777"), &password()).await.unwrap();

        gate.logout().await;
        gate.logout().await;
        assert!(matches!(gate.state().await, AuthState::LoggedOut));
        assert!(store.load().unwrap().is_none());
        assert!(gate.token().await.is_none());
    }

    #[tokio::test]
    async fn test_initial_state_from_store() {
        let existing = Session {
            token: SecretString::from("tok-old"),
            user: user("u-2", "777", Some(UserRole::SuperAdmin)),
        };
        let store = Arc::new(MemorySessionStore::with_session(existing));
        let gate = AuthGate::new(admin_registry(), store);

        assert_eq!(gate.state().await.as_str(), "authenticated");
        assert_eq!(gate.token().await.unwrap().expose_secret(), "tok-old");
    }

    struct FailingStore;

    impl SessionStore for FailingStore {
        fn load(&self) -> Result<Option<Session>, SessionStoreError> {
            Err(SessionStoreError::Io(std::io::Error::other("disk unplugged")))
        }

        fn save(&self, _session: &Session) -> Result<(), SessionStoreError> {
            Err(SessionStoreError::Io(std::io::Error::other("disk full")))
        }

        fn clear(&self) -> Result<(), SessionStoreError> {
            Err(SessionStoreError::Io(std::io::Error::other("read-only")))
        }
    }

    #[tokio::test]
    async fn test_store_failures() {
        let gate = AuthGate::new(admin_registry(), Arc::new(FailingStore));
        assert!(matches!(gate.state().await, AuthState::LoggedOut));

        let err = gate.login(&phone("777"), &password()).await.unwrap_err();
        assert!(matches!(err, AuthError::Store(_)));
        assert!(matches!(gate.state().await, AuthState::LoggedOut));

        gate.logout().await;
        assert!(matches!(gate.state().await, AuthState::LoggedOut));
    }
}
