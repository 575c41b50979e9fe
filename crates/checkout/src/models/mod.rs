//! Domain models for the checkout server.
//!
//! Checkout domain types (catalog, flow, record) live in `bgr-core`; this
//! module holds what is specific to keeping them in a session.

pub mod session;
