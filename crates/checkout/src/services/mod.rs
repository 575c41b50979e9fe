//! Business logic services for the checkout.
//!
//! # Services
//!
//! - `payment` - Simulated card processing; one charge per form at a time
//! - `handoff` - Writes/reads the completed-checkout record
//! - `confirmation` - Welcome email reveal timing and content

pub mod confirmation;
pub mod handoff;
pub mod payment;

pub use confirmation::{EmailReveal, WelcomeEmail};
pub use handoff::{HandoffError, HandoffStore};
pub use payment::{
    ApproveAll, Authorizer, CardInput, PaymentError, PaymentReceipt, PaymentSimulator, Submission,
};
