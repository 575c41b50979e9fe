//! Session-related types.
//!
//! Everything the checkout remembers about a browser lives in its session:
//! the wizard state, the payment form identity, and when the confirmation
//! screen was shown. The completed-checkout record is stored under
//! [`bgr_core::CHECKOUT_RECORD_KEY`] by the handoff service.

use bgr_core::CheckoutFlow;
use chrono::{DateTime, Utc};
use tower_sessions::Session;
use uuid::Uuid;

/// Session keys for checkout data.
pub mod keys {
    /// Key for the in-progress [`bgr_core::CheckoutFlow`].
    pub const CHECKOUT_FLOW: &str = "checkout_flow";

    /// Key for the current payment form's ID (in-flight guard key).
    pub const PAYMENT_FORM_ID: &str = "payment_form_id";

    /// Key for the instant the confirmation screen was mounted.
    pub const CONFIRMATION_MOUNTED_AT: &str = "confirmation_mounted_at";
}

/// Load the flow, starting a fresh one if none is stored.
///
/// # Errors
///
/// Returns an error if the session store fails or the stored value cannot be
/// deserialized.
pub async fn load_flow(session: &Session) -> Result<CheckoutFlow, tower_sessions::session::Error> {
    Ok(session
        .get::<CheckoutFlow>(keys::CHECKOUT_FLOW)
        .await?
        .unwrap_or_default())
}

/// Persist the flow.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn save_flow(
    session: &Session,
    flow: &CheckoutFlow,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::CHECKOUT_FLOW, flow).await
}

/// Discard the flow so the next visit starts at site selection.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn clear_flow(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<CheckoutFlow>(keys::CHECKOUT_FLOW).await?;
    session.remove::<String>(keys::PAYMENT_FORM_ID).await?;
    Ok(())
}

/// Get the payment form ID, creating one when the payment step is first shown.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn payment_form_id(session: &Session) -> Result<String, tower_sessions::session::Error> {
    if let Some(id) = session.get::<String>(keys::PAYMENT_FORM_ID).await? {
        return Ok(id);
    }
    let id = Uuid::new_v4().to_string();
    session.insert(keys::PAYMENT_FORM_ID, &id).await?;
    Ok(id)
}

/// Record that the confirmation screen was mounted now.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn mark_confirmation_mounted(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session
        .insert(keys::CONFIRMATION_MOUNTED_AT, Utc::now())
        .await
}

/// When the confirmation screen was mounted, if it has been.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn confirmation_mounted_at(
    session: &Session,
) -> Result<Option<DateTime<Utc>>, tower_sessions::session::Error> {
    session
        .get::<DateTime<Utc>>(keys::CONFIRMATION_MOUNTED_AT)
        .await
}
