//! Dashboard snapshot cache and the placeholder traffic source.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use rand::Rng;
use supernova_core::User;
use supernova_core::metrics::{DashboardSnapshot, TrafficSource};

/// Random per-day traffic in `[1000, 6000)`.
///
/// Stands in for a real telemetry feed; nothing else in the dashboard is
/// random.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderTraffic;

impl TrafficSource for PlaceholderTraffic {
    fn sample(&mut self, _date: NaiveDate) -> u32 {
        rand::rng().random_range(1000..6000)
    }
}

/// Memoizes the dashboard snapshot against the collection it was derived
/// from.
///
/// A snapshot is recomputed only when handed a collection `Arc` that is not
/// the one last seen.
pub struct MetricsCache<T = PlaceholderTraffic> {
    traffic: Mutex<T>,
    cached: Mutex<Option<Cached>>,
}

struct Cached {
    users: Arc<Vec<User>>,
    snapshot: Arc<DashboardSnapshot>,
}

impl Default for MetricsCache {
    fn default() -> Self {
        Self::new(PlaceholderTraffic)
    }
}

impl<T: TrafficSource> MetricsCache<T> {
    /// Create an empty cache drawing traffic from `traffic`.
    pub const fn new(traffic: T) -> Self {
        Self {
            traffic: Mutex::new(traffic),
            cached: Mutex::new(None),
        }
    }

    /// Snapshot for `users`, using the local clock and time zone.
    pub fn snapshot(&self, users: &Arc<Vec<User>>) -> Arc<DashboardSnapshot> {
        self.snapshot_at(users, &Local::now())
    }

    /// Snapshot for `users` as of `now`.
    ///
    /// `now` is only consulted when the collection changed.
    pub fn snapshot_at<Tz: TimeZone>(
        &self,
        users: &Arc<Vec<User>>,
        now: &DateTime<Tz>,
    ) -> Arc<DashboardSnapshot> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(hit) = cached.as_ref().filter(|c| Arc::ptr_eq(&c.users, users)) {
            return Arc::clone(&hit.snapshot);
        }

        let mut traffic = self.traffic.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = Arc::new(DashboardSnapshot::derive(users, now, &mut *traffic));
        tracing::debug!(user_count = users.len(), "Recomputed dashboard snapshot");

        *cached = Some(Cached {
            users: Arc::clone(users),
            snapshot: Arc::clone(&snapshot),
        });
        snapshot
    }
}
