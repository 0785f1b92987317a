//! Business logic services for admin.
//!
//! # Services
//!
//! - `assistant` - Dashboard-aware questions to the generative-text API
//! - `auth` - Role-gated login and the operator session state machine
//! - `metrics` - Memoized dashboard snapshot and placeholder traffic
//! - `sync` - Registry fetch with cold-start detection, cached collection
//! - `users` - Partial user record updates

pub mod assistant;
pub mod auth;
pub mod metrics;
pub mod sync;
pub mod users;

#[cfg(test)]
pub(crate) mod testing;

pub use assistant::{AssistantBridge, AssistantContext, FALLBACK_ANSWER, greeting};
pub use auth::{AuthError, AuthGate, AuthState};
pub use metrics::{MetricsCache, PlaceholderTraffic};
pub use sync::{RegistryFetcher, SyncError, SyncStatus};
pub use users::{UpdateError, UserEditor};
