//! Boys Gotta Run registration checkout.
//!
//! This crate provides the checkout server as a library so the router can be
//! driven directly in tests. The binary in `main.rs` adds Sentry and serves it.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
