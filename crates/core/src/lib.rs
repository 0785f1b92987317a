//! SuperNova Core - Shared types and dashboard metrics.
//!
//! This crate provides the types used across SuperNova components:
//! - `admin` - The operator console binary (localhost-only)
//! - `integration-tests` - End-to-end tests against stub collaborators
//!
//! # Architecture
//!
//! The core crate contains only types and pure computations - no I/O, no
//! HTTP clients, no clocks. Callers pass the current time and a traffic
//! source in, which keeps every derivation trivially unit-testable.
//!
//! # Modules
//!
//! - [`types`] - Registry records, type-safe IDs, phone numbers, roles
//! - [`metrics`] - Summary statistics and the 7-day chart series

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod metrics;
pub mod types;

pub use types::*;
