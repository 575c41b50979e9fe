//! Boys Gotta Run Core - Shared domain types for registration checkout.
//!
//! This crate holds everything about a registration that does not touch I/O:
//! - the site catalog and its pricing
//! - the two-step checkout flow state machine
//! - the completed-checkout record exchanged with the confirmation screen
//! - presentation formatting for card fields
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no HTTP, no
//! sessions, no timers. The `checkout` server crate owns all of those.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for site IDs, prices, and plan types
//! - [`catalog`] - Read-only list of program sites
//! - [`flow`] - Site selection → payment wizard
//! - [`record`] - `CheckoutRecord` encode/validated decode
//! - [`card`] - Card number, expiry, and CVV formatting

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod card;
pub mod catalog;
pub mod flow;
pub mod record;
pub mod types;

pub use catalog::{Catalog, Site};
pub use flow::{CheckoutFlow, FlowError, Selection, Step};
pub use record::{CHECKOUT_RECORD_KEY, CheckoutRecord, RecordError};
pub use types::*;
