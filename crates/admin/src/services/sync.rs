//! Registry sync: the cached user collection and its fetch status.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::Serialize;
use supernova_core::User;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::registry::RegistryApi;

const REQUEST_FAILED: &str = "Request failed";

/// Why a fetch failed. Display strings are shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// Transport failure, non-success status or unparseable body.
    #[error("API server is currently unreachable.")]
    Unreachable,

    /// No operator token is available.
    #[error("Not logged in")]
    Unauthorized,

    /// The registry answered but reported a failure.
    #[error("{0}")]
    ServerError(String),
}

/// Fetch status shown alongside the collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub loading: bool,
    /// The pending fetch has outlasted the cold-start threshold.
    pub waking: bool,
    pub error: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub user_count: usize,
}

#[derive(Debug, Default)]
struct Outcome {
    error: Option<String>,
    last_synced_at: Option<DateTime<Utc>>,
}

/// Fetches the full registry and holds the latest collection.
///
/// Concurrent fetches are not coalesced; whichever completes last wins.
pub struct RegistryFetcher<R> {
    registry: R,
    cold_start_after: Duration,
    users: RwLock<Arc<Vec<User>>>,
    outcome: RwLock<Outcome>,
    in_flight: AtomicUsize,
    waking: AtomicBool,
}

/// Marks one fetch in flight. The last one out clears `waking`.
struct InFlight<'a> {
    in_flight: &'a AtomicUsize,
    waking: &'a AtomicBool,
}

impl<'a> InFlight<'a> {
    fn start(in_flight: &'a AtomicUsize, waking: &'a AtomicBool) -> Self {
        in_flight.fetch_add(1, Ordering::SeqCst);
        Self { in_flight, waking }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.waking.store(false, Ordering::SeqCst);
        }
    }
}

impl<R: RegistryApi> RegistryFetcher<R> {
    /// Create a fetcher with an empty collection.
    pub fn new(registry: R, cold_start_after: Duration) -> Self {
        Self {
            registry,
            cold_start_after,
            users: RwLock::new(Arc::new(Vec::new())),
            outcome: RwLock::new(Outcome::default()),
            in_flight: AtomicUsize::new(0),
            waking: AtomicBool::new(false),
        }
    }

    /// The current collection. The `Arc` changes identity on every
    /// successful fetch.
    pub async fn users(&self) -> Arc<Vec<User>> {
        Arc::clone(&*self.users.read().await)
    }

    /// Current status.
    pub async fn status(&self) -> SyncStatus {
        let outcome = self.outcome.read().await;
        SyncStatus {
            loading: self.in_flight.load(Ordering::SeqCst) > 0,
            waking: self.waking.load(Ordering::SeqCst),
            error: outcome.error.clone(),
            last_synced_at: outcome.last_synced_at,
            user_count: self.users.read().await.len(),
        }
    }

    /// Whether the pending fetch is past the cold-start threshold.
    pub fn is_waking(&self) -> bool {
        self.waking.load(Ordering::SeqCst)
    }

    /// Fetch the full registry and replace the collection.
    ///
    /// Without a token no request is made. While a request is pending
    /// longer than the cold-start threshold the `waking` indicator is set;
    /// it is cleared once no fetch is left in flight. `loading` stays set
    /// until the collection and status are updated.
    ///
    /// # Errors
    ///
    /// Returns a [`SyncError`], which is also recorded in the status.
    #[instrument(skip(self, token))]
    pub async fn fetch_all(&self, token: Option<&SecretString>) -> Result<Arc<Vec<User>>, SyncError> {
        let _in_flight = InFlight::start(&self.in_flight, &self.waking);
        let result = match token {
            Some(token) => self.fetch(token).await,
            None => Err(SyncError::Unauthorized),
        };

        let mut outcome = self.outcome.write().await;
        match result {
            Ok(users) => {
                tracing::info!(user_count = users.len(), "Registry synced");
                *self.users.write().await = Arc::clone(&users);
                outcome.error = None;
                outcome.last_synced_at = Some(Utc::now());
                Ok(users)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Registry sync failed");
                outcome.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    async fn fetch(&self, token: &SecretString) -> Result<Arc<Vec<User>>, SyncError> {
        self.outcome.write().await.error = None;

        let request = self.registry.list_users(token);
        tokio::pin!(request);
        let cold_start = tokio::time::sleep(self.cold_start_after);
        tokio::pin!(cold_start);

        let result = tokio::select! {
            result = &mut request => result,
            () = &mut cold_start => {
                tracing::info!(threshold = ?self.cold_start_after, "Registry is waking up");
                self.waking.store(true, Ordering::SeqCst);
                request.await
            }
        };

        let response = result.map_err(|e| {
            tracing::warn!(error = %e, "Registry request failed");
            SyncError::Unreachable
        })?;

        if !response.success {
            return Err(SyncError::ServerError(
                response.message_or(REQUEST_FAILED).to_string(),
            ));
        }

        Ok(Arc::new(response.data.unwrap_or_default()))
    }

    /// Users whose name contains `query` (case-insensitive) or whose phone
    /// contains it. A blank query matches everyone.
    pub async fn search(&self, query: &str) -> Vec<User> {
        let users = self.users().await;
        let query = query.trim();
        if query.is_empty() {
            return users.to_vec();
        }

        let needle = query.to_lowercase();
        users
            .iter()
            .filter(|user| user.name.to_lowercase().contains(&needle) || user.phone.contains(query))
            .cloned()
            .collect()
    }

    /// Drop the cached collection and status.
    pub async fn reset(&self) {
        *self.users.write().await = Arc::new(Vec::new());
        *self.outcome.write().await = Outcome::default();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::atomic::Ordering;

    use supernova_core::UserRole;
    use tokio::sync::Notify;

    use super::*;
    use crate::services::testing::{FakeRegistry, failed, user};

    fn token() -> SecretString {
        SecretString::from("tok-123")
    }

    fn registry() -> Arc<FakeRegistry> {
        let mut alice = user("u-1", "+8801711000001", Some(UserRole::User));
        alice.name = "Alice Karim".to_string();
        let mut bob = user("u-2", "+8801811000002", Some(UserRole::Admin));
        bob.name = "Bob Hasan".to_string();
        FakeRegistry::with_users(vec![alice, bob])
    }

    #[tokio::test]
    async fn test_fetch_replaces_collection() {
        let fetcher = RegistryFetcher::new(registry(), Duration::from_secs(3));
        let before = fetcher.users().await;

        let users = fetcher.fetch_all(Some(&token())).await.unwrap();
        assert_eq!(users.len(), 2);
        assert!(Arc::ptr_eq(&users, &fetcher.users().await));
        assert!(!Arc::ptr_eq(&before, &fetcher.users().await));

        let status = fetcher.status().await;
        assert!(!status.loading);
        assert!(!status.waking);
        assert_eq!(status.error, None);
        assert_eq!(status.user_count, 2);
        assert!(status.last_synced_at.is_some());
    }

    #[tokio::test]
    async fn test_without_token_no_request_is_made() {
        let registry = registry();
        let fetcher = RegistryFetcher::new(registry.clone(), Duration::from_secs(3));

        let err = fetcher.fetch_all(None).await.unwrap_err();
        assert_eq!(err, SyncError::Unauthorized);
        assert_eq!(registry.list_calls(), 0);
        assert_eq!(fetcher.status().await.error.as_deref(), Some("Not logged in"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_unreachable() {
        let registry = registry();
        *registry.users.lock().unwrap() = None;
        let fetcher = RegistryFetcher::new(registry, Duration::from_secs(3));

        let err = fetcher.fetch_all(Some(&token())).await.unwrap_err();
        assert_eq!(err, SyncError::Unreachable);
        assert_eq!(
            fetcher.status().await.error.as_deref(),
            Some("API server is currently unreachable.")
        );
    }

    #[tokio::test]
    async fn test_payload_failure_is_server_error() {
        let registry = registry();
        *registry.users.lock().unwrap() = Some(failed("Token expired"));
        let fetcher = RegistryFetcher::new(registry, Duration::from_secs(3));

        let err = fetcher.fetch_all(Some(&token())).await.unwrap_err();
        assert_eq!(err, SyncError::ServerError("Token expired".to_string()));
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_collection_and_next_fetch_clears_error() {
        let registry = registry();
        let fetcher = RegistryFetcher::new(registry.clone(), Duration::from_secs(3));
        fetcher.fetch_all(Some(&token())).await.unwrap();

        let users = registry.users.lock().unwrap().take();
        fetcher.fetch_all(Some(&token())).await.unwrap_err();
        assert_eq!(fetcher.users().await.len(), 2);
        assert!(fetcher.status().await.error.is_some());

        *registry.users.lock().unwrap() = users;
        fetcher.fetch_all(Some(&token())).await.unwrap();
        assert_eq!(fetcher.status().await.error, None);
    }

    async fn assert_cold_start_cycle(succeed: bool) {
        let registry = registry();
        if !succeed {
            *registry.users.lock().unwrap() = None;
        }
        let hold = Arc::new(Notify::new());
        *registry.hold.lock().unwrap() = Some(hold.clone());

        let fetcher = Arc::new(RegistryFetcher::new(registry, Duration::from_millis(50)));
        let task = {
            let fetcher = Arc::clone(&fetcher);
            tokio::spawn(async move { fetcher.fetch_all(Some(&token())).await })
        };

        tokio::time::sleep(Duration::from_millis(250)).await;
        let pending = fetcher.status().await;
        assert!(pending.loading);
        assert!(pending.waking);

        hold.notify_one();
        let result = task.await.unwrap();
        assert_eq!(result.is_ok(), succeed);

        let settled = fetcher.status().await;
        assert!(!settled.loading);
        assert!(!settled.waking);
    }

    #[tokio::test]
    async fn test_cold_start_indicator_on_success() {
        assert_cold_start_cycle(true).await;
    }

    #[tokio::test]
    async fn test_cold_start_indicator_on_failure() {
        assert_cold_start_cycle(false).await;
    }

    #[tokio::test]
    async fn test_fast_fetch_never_reports_waking() {
        let fetcher = RegistryFetcher::new(registry(), Duration::from_secs(3));
        fetcher.fetch_all(Some(&token())).await.unwrap();
        assert!(!fetcher.is_waking());
    }

    #[tokio::test]
    async fn test_cancelled_fetch_clears_indicators() {
        let registry = registry();
        *registry.hold.lock().unwrap() = Some(Arc::new(Notify::new()));
        let fetcher = Arc::new(RegistryFetcher::new(registry, Duration::from_millis(20)));

        let task = {
            let fetcher = Arc::clone(&fetcher);
            tokio::spawn(async move { fetcher.fetch_all(Some(&token())).await })
        };
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(fetcher.is_waking());

        task.abort();
        let _ = task.await;
        assert!(!fetcher.is_waking());
        assert_eq!(fetcher.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_overlapping_fetch_keeps_waking_until_last_settles() {
        let registry = registry();
        let hold = Arc::new(Notify::new());
        *registry.hold.lock().unwrap() = Some(hold.clone());
        let fetcher = Arc::new(RegistryFetcher::new(registry.clone(), Duration::from_millis(20)));

        let slow = {
            let fetcher = Arc::clone(&fetcher);
            tokio::spawn(async move { fetcher.fetch_all(Some(&token())).await })
        };
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(fetcher.is_waking());

        // Only the slow call waits on the hold.
        *registry.hold.lock().unwrap() = None;
        fetcher.fetch_all(Some(&token())).await.unwrap();

        let overlapping = fetcher.status().await;
        assert!(overlapping.loading);
        assert!(overlapping.waking);
        assert_eq!(overlapping.user_count, 2);

        hold.notify_one();
        slow.await.unwrap().unwrap();
        let settled = fetcher.status().await;
        assert!(!settled.loading);
        assert!(!settled.waking);
        assert_eq!(fetcher.in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_loading_holds_until_collection_is_swapped() {
        let registry = registry();
        let fetcher = Arc::new(RegistryFetcher::new(registry.clone(), Duration::from_secs(3)));

        // A reader on the collection parks the fetch after its response,
        // just before the swap.
        let reader = fetcher.users.read().await;
        let task = {
            let fetcher = Arc::clone(&fetcher);
            tokio::spawn(async move { fetcher.fetch_all(Some(&token())).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(registry.list_calls(), 1);
        assert_eq!(fetcher.in_flight.load(Ordering::SeqCst), 1);
        assert!(reader.is_empty());
        drop(reader);

        task.await.unwrap().unwrap();
        assert_eq!(fetcher.in_flight.load(Ordering::SeqCst), 0);
        assert_eq!(fetcher.users().await.len(), 2);
    }

    #[tokio::test]
    async fn test_search_by_name_or_phone() {
        let fetcher = RegistryFetcher::new(registry(), Duration::from_secs(3));
        fetcher.fetch_all(Some(&token())).await.unwrap();

        let by_name = fetcher.search("alice").await;
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].id.as_str(), "u-1");

        let by_phone = fetcher.search("1811").await;
        assert_eq!(by_phone.len(), 1);
        assert_eq!(by_phone[0].id.as_str(), "u-2");

        assert_eq!(fetcher.search("  ").await.len(), 2);
        assert!(fetcher.search("zed").await.is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_collection() {
        let fetcher = RegistryFetcher::new(registry(), Duration::from_secs(3));
        fetcher.fetch_all(Some(&token())).await.unwrap();

        fetcher.reset().await;
        let status = fetcher.status().await;
        assert_eq!(status.user_count, 0);
        assert!(status.last_synced_at.is_none());
    }
}
