//! Simulated payment processing.
//!
//! No processor is contacted and no card data leaves the process. A
//! submission is validated, held in flight for a fixed latency, then handed
//! to an [`Authorizer`] for a decision. The built-in [`ApproveAll`] always
//! approves; the decline path exists for processors that can refuse.
//!
//! A second submission from a form that is already in flight never starts
//! another charge. It waits for the first one and shares its outcome.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bgr_core::Price;
use bgr_core::card::{format_card_number, format_cvv, format_expiry};
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::sync::watch;
use tracing::instrument;
use uuid::Uuid;

/// Errors from a payment submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaymentError {
    /// A required card field is empty.
    #[error("Please fill in all card fields")]
    Validation,

    /// The in-flight submission this one waited on was abandoned before it
    /// finished.
    #[error("Your earlier payment attempt did not finish. Please try again")]
    Interrupted,

    /// The authorizer refused the charge.
    #[error("Payment declined: {reason}")]
    Declined { reason: String },
}

// =============================================================================
// Card Input
// =============================================================================

/// Card details as entered on the payment form, after formatting.
///
/// Card number and CVV are kept secret: `Debug` redacts them and they are
/// never logged or persisted.
#[derive(Clone)]
pub struct CardInput {
    cardholder_name: String,
    card_number: SecretString,
    expiry_date: String,
    cvv: SecretString,
}

impl CardInput {
    /// Build from raw form values, applying the display formatting.
    #[must_use]
    pub fn from_raw(cardholder_name: &str, card_number: &str, expiry_date: &str, cvv: &str) -> Self {
        Self {
            cardholder_name: cardholder_name.trim().to_string(),
            card_number: SecretString::from(format_card_number(card_number)),
            expiry_date: format_expiry(expiry_date),
            cvv: SecretString::from(format_cvv(cvv)),
        }
    }

    /// Demo values the payment form is pre-filled with.
    #[must_use]
    pub fn demo() -> Self {
        Self::from_raw("John Doe", "4242 4242 4242 4242", "12/25", "123")
    }

    #[must_use]
    pub fn cardholder_name(&self) -> &str {
        &self.cardholder_name
    }

    #[must_use]
    pub const fn card_number(&self) -> &SecretString {
        &self.card_number
    }

    #[must_use]
    pub fn expiry_date(&self) -> &str {
        &self.expiry_date
    }

    #[must_use]
    pub const fn cvv(&self) -> &SecretString {
        &self.cvv
    }

    /// Last four card digits (or fewer if fewer were entered).
    #[must_use]
    pub fn last4(&self) -> String {
        let digits: Vec<char> = self
            .card_number
            .expose_secret()
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        let start = digits.len().saturating_sub(4);
        digits.get(start..).unwrap_or_default().iter().collect()
    }

    /// All four fields must be non-empty. Nothing else is checked.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Validation`] if any field is empty.
    pub fn validate(&self) -> Result<(), PaymentError> {
        let fields = [
            self.cardholder_name.as_str(),
            self.card_number.expose_secret(),
            self.expiry_date.as_str(),
            self.cvv.expose_secret(),
        ];
        if fields.iter().any(|f| f.is_empty()) {
            return Err(PaymentError::Validation);
        }
        Ok(())
    }
}

impl fmt::Debug for CardInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardInput")
            .field("cardholder_name", &self.cardholder_name)
            .field("card_number", &"[REDACTED]")
            .field("expiry_date", &self.expiry_date)
            .field("cvv", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// Authorization
// =============================================================================

/// Decides whether a simulated charge goes through.
pub trait Authorizer: Send + Sync {
    /// Approve or decline a charge of `amount` to `card`.
    ///
    /// # Errors
    ///
    /// Returns [`PaymentError::Declined`] to refuse the charge.
    fn authorize(&self, card: &CardInput, amount: Price) -> Result<(), PaymentError>;
}

/// Approves every charge. The demo flow never declines.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproveAll;

impl Authorizer for ApproveAll {
    fn authorize(&self, _card: &CardInput, _amount: Price) -> Result<(), PaymentError> {
        Ok(())
    }
}

/// Proof of a simulated charge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub reference: Uuid,
    pub amount: Price,
    pub card_last4: String,
    pub processed_at: DateTime<Utc>,
}

// =============================================================================
// Simulator
// =============================================================================

/// How a submission was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// This submission ran the charge.
    Charged(PaymentReceipt),
    /// The same form was already in flight; that charge went through.
    Joined,
}

type Outcome = Result<PaymentReceipt, PaymentError>;
type InFlight = Arc<Mutex<HashMap<String, watch::Sender<Option<Outcome>>>>>;

/// Payment simulator shared by all requests.
///
/// Tracks which payment forms have a submission in flight so a form is
/// charged at most once while its first submission is still processing.
#[derive(Clone)]
pub struct PaymentSimulator {
    latency: Duration,
    authorizer: Arc<dyn Authorizer>,
    in_flight: InFlight,
}

impl PaymentSimulator {
    /// Create a simulator that approves every charge after `latency`.
    #[must_use]
    pub fn new(latency: Duration) -> Self {
        Self::with_authorizer(latency, Arc::new(ApproveAll))
    }

    /// Create a simulator with a custom authorizer.
    #[must_use]
    pub fn with_authorizer(latency: Duration, authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            latency,
            authorizer,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Submit a payment for the form identified by `form_id`.
    ///
    /// Validation failures return immediately without entering the
    /// processing state. If `form_id` is already in flight, no second charge
    /// starts: this call waits for the first and reports its outcome. If the
    /// returned future is dropped while charging, the in-flight marker is
    /// released and no receipt is produced.
    ///
    /// # Errors
    ///
    /// - [`PaymentError::Validation`] if a card field is empty
    /// - [`PaymentError::Declined`] if the authorizer refuses the charge
    /// - [`PaymentError::Interrupted`] if the in-flight submission being
    ///   waited on was abandoned
    #[instrument(skip(self, card))]
    pub async fn submit(
        &self,
        form_id: &str,
        card: &CardInput,
        amount: Price,
    ) -> Result<Submission, PaymentError> {
        card.validate()?;

        match self.begin(form_id) {
            Ok(guard) => {
                let outcome = self.charge(card, amount).await;
                guard.finish(outcome.clone());
                outcome.map(Submission::Charged)
            }
            Err(pending) => {
                tracing::info!("Payment submitted while already processing, joining it");
                Self::join(pending).await.map(|_| Submission::Joined)
            }
        }
    }

    async fn charge(&self, card: &CardInput, amount: Price) -> Outcome {
        tokio::time::sleep(self.latency).await;

        self.authorizer.authorize(card, amount).inspect_err(|e| {
            tracing::warn!(error = %e, "Simulated payment declined");
        })?;

        let receipt = PaymentReceipt {
            reference: Uuid::new_v4(),
            amount,
            card_last4: card.last4(),
            processed_at: Utc::now(),
        };
        tracing::info!(
            reference = %receipt.reference,
            last4 = %receipt.card_last4,
            "Simulated payment approved"
        );
        Ok(receipt)
    }

    async fn join(mut pending: watch::Receiver<Option<Outcome>>) -> Outcome {
        match pending.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).clone().unwrap_or(Err(PaymentError::Interrupted)),
            Err(_) => {
                tracing::warn!("Joined payment was abandoned");
                Err(PaymentError::Interrupted)
            }
        }
    }

    /// Mark `form_id` as in flight, or subscribe to the submission that
    /// already is.
    fn begin(&self, form_id: &str) -> Result<InFlightGuard, watch::Receiver<Option<Outcome>>> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = in_flight.get(form_id) {
            return Err(pending.subscribe());
        }
        let (sender, _) = watch::channel(None);
        in_flight.insert(form_id.to_string(), sender);
        Ok(InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            form_id: form_id.to_string(),
        })
    }

    #[cfg(test)]
    fn is_processing(&self, form_id: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(form_id)
    }
}

impl fmt::Debug for PaymentSimulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaymentSimulator")
            .field("latency", &self.latency)
            .finish_non_exhaustive()
    }
}

/// Marks a form as processing until dropped.
///
/// Dropping without [`finish`](Self::finish) closes the channel, which tells
/// joined submissions the charge was abandoned.
struct InFlightGuard {
    in_flight: InFlight,
    form_id: String,
}

impl InFlightGuard {
    /// Publish the outcome to joined submissions, then release the form.
    fn finish(self, outcome: Outcome) {
        let in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(sender) = in_flight.get(&self.form_id) {
            sender.send_replace(Some(outcome));
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.form_id);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct DeclineAll;

    impl Authorizer for DeclineAll {
        fn authorize(&self, _card: &CardInput, _amount: Price) -> Result<(), PaymentError> {
            Err(PaymentError::Declined {
                reason: "insufficient funds".to_string(),
            })
        }
    }

    /// Approves every charge and counts them.
    #[derive(Default)]
    struct CountCharges(AtomicUsize);

    impl Authorizer for CountCharges {
        fn authorize(&self, _card: &CardInput, _amount: Price) -> Result<(), PaymentError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    const LATENCY: Duration = Duration::from_millis(1500);

    #[test]
    fn test_from_raw_applies_formatting() {
        let card = CardInput::from_raw(" Jane Roe ", "4242424242424242", "1225", "12a3");
        assert_eq!(card.cardholder_name(), "Jane Roe");
        assert_eq!(card.card_number().expose_secret(), "4242 4242 4242 4242");
        assert_eq!(card.expiry_date(), "12/25");
        assert_eq!(card.cvv().expose_secret(), "123");
        assert_eq!(card.last4(), "4242");
    }

    #[test]
    fn test_validate_requires_every_field() {
        assert!(CardInput::demo().validate().is_ok());

        let cases = [
            CardInput::from_raw("", "4242424242424242", "1225", "123"),
            CardInput::from_raw("Jane", "", "1225", "123"),
            CardInput::from_raw("Jane", "4242424242424242", "", "123"),
            CardInput::from_raw("Jane", "4242424242424242", "1225", ""),
            // formatting strips everything, leaving an empty field
            CardInput::from_raw("Jane", "abcd", "1225", "123"),
            CardInput::from_raw("Jane", "4242424242424242", "1225", "xyz"),
        ];
        for card in cases {
            assert_eq!(card.validate(), Err(PaymentError::Validation), "{card:?}");
        }
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug_output = format!("{:?}", CardInput::demo());
        assert!(debug_output.contains("John Doe"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("4242"));
        assert!(!debug_output.contains("123"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_waits_latency_then_approves() {
        let simulator = PaymentSimulator::new(LATENCY);
        let start = tokio::time::Instant::now();

        let Submission::Charged(receipt) = simulator
            .submit("form-1", &CardInput::demo(), Price::whole(650))
            .await
            .unwrap()
        else {
            panic!("expected a charge");
        };

        assert!(start.elapsed() >= LATENCY);
        assert_eq!(receipt.amount, Price::whole(650));
        assert_eq!(receipt.card_last4, "4242");
        assert!(!simulator.is_processing("form-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_validation_error_skips_processing() {
        let simulator = PaymentSimulator::new(LATENCY);
        let start = tokio::time::Instant::now();
        let card = CardInput::from_raw("", "4242424242424242", "1225", "123");

        let result = simulator.submit("form-1", &card, Price::whole(150)).await;

        assert_eq!(result, Err(PaymentError::Validation));
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(!simulator.is_processing("form-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_submit_joins_the_first() {
        let charges = Arc::new(CountCharges::default());
        let simulator = PaymentSimulator::with_authorizer(LATENCY, charges.clone());
        let card = CardInput::demo();
        let start = tokio::time::Instant::now();

        let (first, second) = tokio::join!(
            simulator.submit("form-1", &card, Price::whole(150)),
            simulator.submit("form-1", &card, Price::whole(150)),
        );

        assert!(matches!(first, Ok(Submission::Charged(_))));
        assert_eq!(second, Ok(Submission::Joined));
        assert_eq!(charges.0.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < LATENCY * 2);
        assert!(!simulator.is_processing("form-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_joined_submit_shares_decline() {
        let simulator = PaymentSimulator::with_authorizer(LATENCY, Arc::new(DeclineAll));
        let card = CardInput::demo();

        let (first, second) = tokio::join!(
            simulator.submit("form-1", &card, Price::whole(150)),
            simulator.submit("form-1", &card, Price::whole(150)),
        );

        assert!(matches!(first, Err(PaymentError::Declined { .. })));
        assert_eq!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_joined_submit_reports_abandoned_charge() {
        let simulator = PaymentSimulator::new(LATENCY);
        let card = CardInput::demo();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(10),
            simulator.submit("form-1", &card, Price::whole(150)),
        );
        let (first, second) = tokio::join!(
            abandoned,
            simulator.submit("form-1", &card, Price::whole(150)),
        );

        assert!(first.is_err());
        assert_eq!(second, Err(PaymentError::Interrupted));
        assert!(!simulator.is_processing("form-1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_forms_process_independently() {
        let simulator = PaymentSimulator::new(LATENCY);
        let card = CardInput::demo();

        let (first, second) = tokio::join!(
            simulator.submit("form-1", &card, Price::whole(150)),
            simulator.submit("form-2", &card, Price::whole(150)),
        );

        assert!(first.is_ok());
        assert!(second.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_submission_releases_form() {
        let simulator = PaymentSimulator::new(LATENCY);
        let card = CardInput::demo();

        let pending = simulator.submit("form-1", &card, Price::whole(150));
        let timed_out = tokio::time::timeout(Duration::from_millis(10), pending).await;
        assert!(timed_out.is_err());

        assert!(!simulator.is_processing("form-1"));
        assert!(
            simulator
                .submit("form-1", &card, Price::whole(150))
                .await
                .is_ok()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_declining_authorizer() {
        let simulator = PaymentSimulator::with_authorizer(LATENCY, Arc::new(DeclineAll));

        let result = simulator
            .submit("form-1", &CardInput::demo(), Price::whole(150))
            .await;

        assert!(matches!(result, Err(PaymentError::Declined { .. })));
        assert!(!simulator.is_processing("form-1"));
    }
}
