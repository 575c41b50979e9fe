//! Confirmation screen scheduling and the simulated welcome email.
//!
//! The confirmation screen shows a "sending" placeholder, then swaps in a
//! preview of the welcome email once [`EmailReveal`]'s delay has elapsed
//! since the screen was mounted. No email is actually sent.

use std::time::Duration;

use bgr_core::CheckoutRecord;
use chrono::{DateTime, Utc};

/// One-shot reveal of the email preview, measured from screen mount.
///
/// Waiting happens inside the request that fetches the preview, so the
/// scheduled reveal lives exactly as long as that request: dropping it
/// (navigation away, closed tab) cancels the wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmailReveal {
    mounted_at: DateTime<Utc>,
    delay: Duration,
}

impl EmailReveal {
    #[must_use]
    pub const fn new(mounted_at: DateTime<Utc>, delay: Duration) -> Self {
        Self { mounted_at, delay }
    }

    /// Time left before the preview may be shown.
    ///
    /// A `now` earlier than the mount instant counts as no time elapsed.
    #[must_use]
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        let elapsed = (now - self.mounted_at).to_std().unwrap_or(Duration::ZERO);
        self.delay.saturating_sub(elapsed)
    }

    /// Sleep until the preview is due, as seen from `now`.
    pub async fn wait_from(&self, now: DateTime<Utc>) {
        let remaining = self.remaining(now);
        if !remaining.is_zero() {
            tokio::time::sleep(remaining).await;
        }
    }

    /// Sleep until the preview is due.
    pub async fn wait(&self) {
        self.wait_from(Utc::now()).await;
    }
}

/// Registration details repeated in the email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSummary {
    pub site_name: String,
    pub plan_label: &'static str,
    pub price: String,
}

/// Simulated welcome email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WelcomeEmail {
    pub from: &'static str,
    pub subject: &'static str,
    pub greeting: &'static str,
    pub intro: String,
    pub summary: Option<EmailSummary>,
    pub next_steps: &'static str,
}

impl WelcomeEmail {
    /// Compose the welcome email from the checkout record, or generic text
    /// when there is none.
    #[must_use]
    pub fn compose(record: Option<&CheckoutRecord>) -> Self {
        let summary = record.map(|r| EmailSummary {
            site_name: r.site_name.clone(),
            plan_label: r.pricing_type.label(),
            price: r.price.to_string(),
        });

        let intro = summary.as_ref().map_or_else(
            || "Thank you for registering with Boys Gotta Run! Your registration is confirmed."
                .to_string(),
            |s| {
                format!(
                    "Thank you for registering with Boys Gotta Run! Your child is enrolled at {} on the {} plan, and we received your payment of {}.",
                    s.site_name, s.plan_label, s.price
                )
            },
        );

        Self {
            from: "Boys Gotta Run",
            subject: "Welcome to Boys Gotta Run!",
            greeting: "Hi there,",
            intro,
            summary,
            next_steps: "Your coach will be in touch with practice times and what to bring. You can manage your registration anytime from the Parent Portal.",
        }
    }
}
