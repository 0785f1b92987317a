//! Derived dashboard values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Direction indicator shown next to a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

/// A single stat card on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub label: String,
    pub value: usize,
    /// Percent shown beside the value.
    pub change: u32,
    pub trend: Trend,
}

impl Metric {
    /// Create a count metric.
    #[must_use]
    pub fn count(label: &str, value: usize, change: u32, trend: Trend) -> Self {
        Self {
            label: label.to_string(),
            value,
            change,
            trend,
        }
    }
}

/// One day of the signup chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartBucket {
    /// Short weekday name (`Sun`..`Sat`).
    pub name: String,
    /// Calendar date the bucket covers.
    pub date: NaiveDate,
    /// Placeholder traffic sample.
    pub traffic: u32,
    /// Users created on `date`.
    pub users: usize,
}
