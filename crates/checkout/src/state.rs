//! Application state shared across handlers.

use std::sync::Arc;

use bgr_core::Catalog;

use crate::config::CheckoutConfig;
use crate::middleware::CheckoutSessionStore;
use crate::services::{Authorizer, PaymentSimulator};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// configuration, the site catalog, the payment simulator and the session
/// store.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: CheckoutConfig,
    catalog: Catalog,
    payments: PaymentSimulator,
    sessions: CheckoutSessionStore,
}

impl AppState {
    /// Create a new application state with the built-in catalog.
    #[must_use]
    pub fn new(config: CheckoutConfig) -> Self {
        let payments = PaymentSimulator::new(config.timing.payment_latency);
        Self::from_parts(config, Catalog::builtin(), payments)
    }

    /// Create state whose payments are decided by `authorizer`.
    #[must_use]
    pub fn with_authorizer(config: CheckoutConfig, authorizer: Arc<dyn Authorizer>) -> Self {
        let payments =
            PaymentSimulator::with_authorizer(config.timing.payment_latency, authorizer);
        Self::from_parts(config, Catalog::builtin(), payments)
    }

    fn from_parts(config: CheckoutConfig, catalog: Catalog, payments: PaymentSimulator) -> Self {
        let sessions = CheckoutSessionStore::from_config(&config);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                payments,
                sessions,
            }),
        }
    }

    /// Get a reference to the checkout configuration.
    #[must_use]
    pub fn config(&self) -> &CheckoutConfig {
        &self.inner.config
    }

    /// Get a reference to the site catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Get a reference to the payment simulator.
    #[must_use]
    pub fn payments(&self) -> &PaymentSimulator {
        &self.inner.payments
    }

    /// Get a reference to the session store.
    #[must_use]
    pub fn sessions(&self) -> &CheckoutSessionStore {
        &self.inner.sessions
    }
}
