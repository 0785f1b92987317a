//! Dashboard metrics derived from the registry collection.
//!
//! Everything here is a pure function of its inputs. The clock and the
//! traffic data are passed in, so the admin console decides when to
//! recompute (on collection change) and where traffic numbers come from.

use chrono::{DateTime, Days, NaiveDate, TimeDelta, TimeZone, Utc};
use serde::Serialize;

use crate::types::{ChartBucket, Metric, Trend, User};

/// Number of calendar days covered by the chart, today included.
pub const LOOKBACK_DAYS: u64 = 7;

/// Window, in hours, used for the "new today" count.
pub const NEW_USER_WINDOW_HOURS: i64 = 24;

/// Summary counts over a user collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total: usize,
    pub active: usize,
    pub deleted: usize,
    pub new_today: usize,
}

impl DashboardStats {
    /// Count users by state.
    ///
    /// `new_today` includes only users created strictly after `now - 24h`.
    #[must_use]
    pub fn derive(users: &[User], now: DateTime<Utc>) -> Self {
        let cutoff = now - TimeDelta::hours(NEW_USER_WINDOW_HOURS);
        let deleted = users.iter().filter(|u| u.is_deleted).count();

        Self {
            total: users.len(),
            active: users.len() - deleted,
            deleted,
            new_today: users.iter().filter(|u| u.created_at > cutoff).count(),
        }
    }

    /// Share of active users, rounded half-up. Zero for an empty registry.
    #[must_use]
    pub fn active_percent(&self) -> u32 {
        percent(self.active, self.total)
    }

    /// Share of deleted users, rounded half-up. Zero for an empty registry.
    #[must_use]
    pub fn deleted_percent(&self) -> u32 {
        percent(self.deleted, self.total)
    }

    /// Display heuristic for the "New Today" card: 100 when anyone joined.
    #[must_use]
    pub const fn new_today_change(&self) -> u32 {
        if self.new_today > 0 { 100 } else { 0 }
    }

    /// The four stat cards, in display order.
    #[must_use]
    pub fn metrics(&self) -> Vec<Metric> {
        vec![
            Metric::count("Total Database", self.total, 100, Trend::Neutral),
            Metric::count("Active Users", self.active, self.active_percent(), Trend::Up),
            Metric::count(
                "Deleted/Inactive",
                self.deleted,
                self.deleted_percent(),
                Trend::Down,
            ),
            Metric::count(
                "New Today",
                self.new_today,
                self.new_today_change(),
                Trend::Up,
            ),
        ]
    }
}

/// `round(part / total * 100)` in integer arithmetic, half rounding up.
fn percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let rounded = (part * 200 + total) / (total * 2);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

/// Source of per-day traffic numbers for the chart.
///
/// There is no real telemetry feed yet; the admin console plugs in a random
/// placeholder. Closures `FnMut(NaiveDate) -> u32` implement this trait.
pub trait TrafficSource {
    /// Traffic figure for one calendar day.
    fn sample(&mut self, date: NaiveDate) -> u32;
}

impl<F> TrafficSource for F
where
    F: FnMut(NaiveDate) -> u32,
{
    fn sample(&mut self, date: NaiveDate) -> u32 {
        self(date)
    }
}

/// Build the 7-day chart ending on `now`'s calendar date, oldest first.
///
/// Buckets are keyed by calendar date in `now`'s time zone and labelled with
/// the short weekday name. A user counts toward a bucket only if their
/// `created_at`, seen in the same time zone, falls on that date. Users created
/// before the window are not counted anywhere, even if they share a weekday
/// name with a bucket.
pub fn bucket_signups<Tz, T>(users: &[User], now: &DateTime<Tz>, traffic: &mut T) -> Vec<ChartBucket>
where
    Tz: TimeZone,
    T: TrafficSource + ?Sized,
{
    let today = now.date_naive();
    let zone = now.timezone();

    let mut buckets: Vec<ChartBucket> = (0..LOOKBACK_DAYS)
        .rev()
        .map(|back| {
            let date = today - Days::new(back);
            ChartBucket {
                name: date.format("%a").to_string(),
                date,
                traffic: traffic.sample(date),
                users: 0,
            }
        })
        .collect();

    for user in users {
        let created = user.created_at.with_timezone(&zone).date_naive();
        if let Some(bucket) = buckets.iter_mut().find(|b| b.date == created) {
            bucket.users += 1;
        }
    }

    buckets
}

/// Everything the dashboard shows, derived from one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSnapshot {
    pub stats: DashboardStats,
    pub metrics: Vec<Metric>,
    pub chart: Vec<ChartBucket>,
}

impl DashboardSnapshot {
    /// Derive stats, stat cards and chart in one pass.
    pub fn derive<Tz, T>(users: &[User], now: &DateTime<Tz>, traffic: &mut T) -> Self
    where
        Tz: TimeZone,
        T: TrafficSource + ?Sized,
    {
        let stats = DashboardStats::derive(users, now.with_timezone(&Utc));
        Self {
            stats,
            metrics: stats.metrics(),
            chart: bucket_signups(users, now, traffic),
        }
    }
}
