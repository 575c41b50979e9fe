//! Whole-unit program prices.
//!
//! Registration fees are whole dollars with no cents and a single currency,
//! so a price is a positive integer. Zero is unrepresentable.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceError {
    /// Prices must be positive.
    #[error("price must be greater than zero")]
    Zero,
}

/// A positive price in whole currency units.
///
/// ```
/// use bgr_core::Price;
///
/// let price = Price::new(650).unwrap();
/// assert_eq!(price.to_string(), "$650");
/// assert!(Price::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(NonZeroU32);

impl Price {
    /// Create a price from a whole amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Zero`] for a zero amount.
    pub const fn new(amount: u32) -> Result<Self, PriceError> {
        match NonZeroU32::new(amount) {
            Some(amount) => Ok(Self(amount)),
            None => Err(PriceError::Zero),
        }
    }

    /// Create a price in a const context.
    ///
    /// # Panics
    ///
    /// Panics when `amount` is zero. Used only for `const` catalog entries,
    /// where the panic surfaces as a compile error.
    #[must_use]
    pub const fn whole(amount: u32) -> Self {
        match NonZeroU32::new(amount) {
            Some(amount) => Self(amount),
            None => panic!("price must be greater than zero"),
        }
    }

    /// Get the amount in whole currency units.
    #[must_use]
    pub const fn amount(&self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}
