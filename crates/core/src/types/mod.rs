//! Core types for registration checkout.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod plan;
pub mod price;

pub use id::{SiteId, SiteIdError};
pub use plan::{PlanType, PlanTypeError};
pub use price::{Price, PriceError};
