//! SuperNova Admin library.
//!
//! The operator console for a remote user registry, exposed as a library so
//! the binary and the integration tests share one router.
//!
//! # Security
//!
//! This crate holds a privileged registry token for the logged-in operator
//! and a generative-text API key. It binds to localhost by default; only
//! accounts holding the `super_admin` role can log in.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod gemini;
pub mod middleware;
pub mod registry;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;
