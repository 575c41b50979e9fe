//! Session handoff from the payment step to the confirmation screen.
//!
//! On payment success the selection is turned into a [`CheckoutRecord`] and
//! written under [`CHECKOUT_RECORD_KEY`] before the redirect to `/success`.
//! The confirmation screen reads it back through [`load`], which validates
//! the stored text instead of trusting its shape.

use std::future::Future;

use bgr_core::{CHECKOUT_RECORD_KEY, Catalog, CheckoutRecord, RecordError, Selection, SiteId};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tower_sessions::Session;

/// Errors writing or reading the checkout record.
#[derive(Debug, Error)]
pub enum HandoffError {
    /// Commit was attempted with no site chosen.
    #[error("no site selected")]
    NoSiteSelected,

    /// The chosen site is no longer in the catalog.
    #[error("unknown site: {0}")]
    UnknownSite(SiteId),

    /// The record could not be serialized.
    #[error("failed to encode checkout record: {0}")]
    Encode(#[source] RecordError),

    /// Stored text is not a valid record.
    #[error("stored checkout record is invalid: {0}")]
    Malformed(#[source] RecordError),

    /// The backing store failed.
    #[error("session store error: {0}")]
    Store(#[from] tower_sessions::session::Error),
}

/// String key-value store used to pass the record between screens.
pub trait HandoffStore: Send + Sync {
    /// Read the value under `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>, HandoffError>> + Send;

    /// Write `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: String) -> impl Future<Output = Result<(), HandoffError>> + Send;
}

impl HandoffStore for Session {
    async fn get(&self, key: &str) -> Result<Option<String>, HandoffError> {
        Ok(Self::get::<String>(self, key).await?)
    }

    async fn set(&self, key: &str, value: String) -> Result<(), HandoffError> {
        self.insert(key, value).await?;
        Ok(())
    }
}

/// Build the record for `selection` as of `now`.
///
/// # Errors
///
/// Returns [`HandoffError::NoSiteSelected`] or [`HandoffError::UnknownSite`]
/// when the selection does not resolve to a catalog site.
pub fn build_record(
    catalog: &Catalog,
    selection: &Selection,
    now: DateTime<Utc>,
) -> Result<CheckoutRecord, HandoffError> {
    let site_id = selection
        .site_id
        .as_ref()
        .ok_or(HandoffError::NoSiteSelected)?;
    let site = catalog
        .find(site_id)
        .ok_or_else(|| HandoffError::UnknownSite(site_id.clone()))?;
    Ok(CheckoutRecord::new(site, selection.plan_type, now))
}

/// Write the completed checkout to `store`, overwriting any earlier record.
///
/// # Errors
///
/// Returns an error if the selection does not resolve to a site, the record
/// cannot be encoded, or the store write fails.
pub async fn commit<S: HandoffStore>(
    store: &S,
    catalog: &Catalog,
    selection: &Selection,
) -> Result<CheckoutRecord, HandoffError> {
    let record = build_record(catalog, selection, Utc::now())?;
    let encoded = record.encode().map_err(HandoffError::Encode)?;
    store.set(CHECKOUT_RECORD_KEY, encoded).await?;

    tracing::info!(
        site_id = %record.site_id,
        plan = %record.pricing_type,
        price = %record.price,
        "Checkout record committed"
    );
    Ok(record)
}

/// Read the checkout record from `store`.
///
/// Returns `Ok(None)` when nothing has been committed.
///
/// # Errors
///
/// Returns [`HandoffError::Malformed`] when the stored text does not decode
/// into a valid record, or [`HandoffError::Store`] if the read fails.
pub async fn load<S: HandoffStore>(store: &S) -> Result<Option<CheckoutRecord>, HandoffError> {
    let Some(raw) = store.get(CHECKOUT_RECORD_KEY).await? else {
        return Ok(None);
    };
    CheckoutRecord::decode(&raw)
        .map(Some)
        .map_err(HandoffError::Malformed)
}
