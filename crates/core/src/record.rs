//! Completed-checkout record handed from payment to the confirmation screen.
//!
//! The record is stored as JSON under [`CHECKOUT_RECORD_KEY`]. Decoding is
//! the trust boundary: stored text either becomes a fully typed
//! [`CheckoutRecord`] or a [`RecordError`], never a partially-filled value.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Site;
use crate::types::{PlanType, Price, SiteId};

/// Fixed key the record is stored under.
pub const CHECKOUT_RECORD_KEY: &str = "bgr_checkout";

/// Errors encoding or decoding a [`CheckoutRecord`].
#[derive(Debug, Error)]
pub enum RecordError {
    /// Stored JSON does not match the record shape.
    #[error("malformed checkout record: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Shape is right but a field is unusable.
    #[error("invalid checkout record: {0}")]
    Invalid(&'static str),
}

/// Summary of a completed (simulated) payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRecord {
    pub site_id: SiteId,
    pub site_name: String,
    pub pricing_type: PlanType,
    pub price: Price,
    pub timestamp: DateTime<Utc>,
}

impl CheckoutRecord {
    /// Build a record for `site` and `plan` at time `timestamp`.
    ///
    /// The site name and price are resolved from the site here rather than
    /// carried alongside the selection.
    #[must_use]
    pub fn new(site: &Site, plan: PlanType, timestamp: DateTime<Utc>) -> Self {
        Self {
            site_id: site.id.clone(),
            site_name: site.name.clone(),
            pricing_type: plan,
            price: site.pricing.get(plan),
            timestamp,
        }
    }

    /// Serialize to the stored JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Malformed`] if serialization fails.
    pub fn encode(&self) -> Result<String, RecordError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode and validate stored JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::Malformed`] for JSON that does not fit the
    /// record shape (including unknown plan types, non-positive prices,
    /// empty site IDs, and unparseable timestamps), and
    /// [`RecordError::Invalid`] for a blank site name.
    pub fn decode(raw: &str) -> Result<Self, RecordError> {
        let record: Self = serde_json::from_str(raw)?;
        if record.site_name.trim().is_empty() {
            return Err(RecordError::Invalid("siteName is empty"));
        }
        Ok(record)
    }
}
