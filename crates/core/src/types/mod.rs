//! Core types for SuperNova.
//!
//! This module provides type-safe wrappers for registry concepts.

pub mod id;
pub mod metric;
pub mod phone;
pub mod role;
pub mod user;

pub use id::UserId;
pub use metric::{ChartBucket, Metric, Trend};
pub use phone::{Phone, PhoneError};
pub use role::{BloodGroup, Gender, UserRole};
pub use user::{User, UserUpdate};
