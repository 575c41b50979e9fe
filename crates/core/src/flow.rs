//! Two-step checkout wizard: site selection, then payment.
//!
//! ```text
//! site ──advance (site chosen)──▶ payment ──pay (handoff)──▶ exit
//!   ▲                                │
//!   └──────────────back──────────────┘
//! ```
//!
//! The selection is editable only in step `site`. Going back keeps it, so
//! re-entering payment resumes the earlier choices.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{Catalog, Site};
use crate::types::{PlanType, Price, SiteId};

/// Errors from flow transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FlowError {
    /// The selection was edited while in step `payment`.
    #[error("selection cannot change during payment; go back to site selection first")]
    SelectionFrozen,
}

/// Current wizard step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    #[default]
    Site,
    Payment,
}

/// The user's in-progress choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Selection {
    /// `None` means no site chosen yet.
    pub site_id: Option<SiteId>,
    pub plan_type: PlanType,
}

impl Selection {
    /// The chosen site, if it is still in the catalog.
    #[must_use]
    pub fn selected_site<'a>(&self, catalog: &'a Catalog) -> Option<&'a Site> {
        self.site_id.as_ref().and_then(|id| catalog.find(id))
    }

    /// Price of the chosen plan at the chosen site.
    #[must_use]
    pub fn price(&self, catalog: &Catalog) -> Option<Price> {
        self.selected_site(catalog)
            .map(|site| site.pricing.get(self.plan_type))
    }
}

/// Wizard state kept for one browser session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CheckoutFlow {
    selection: Selection,
    step: Step,
}

impl CheckoutFlow {
    /// Fresh flow: no site, monthly plan, step `site`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    #[must_use]
    pub const fn step(&self) -> Step {
        self.step
    }

    /// Choose (or clear) the site.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::SelectionFrozen`] in step `payment`.
    pub fn select_site(&mut self, site_id: Option<SiteId>) -> Result<(), FlowError> {
        self.ensure_editable()?;
        self.selection.site_id = site_id;
        Ok(())
    }

    /// Choose the plan type.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::SelectionFrozen`] in step `payment`.
    pub fn select_plan(&mut self, plan_type: PlanType) -> Result<(), FlowError> {
        self.ensure_editable()?;
        self.selection.plan_type = plan_type;
        Ok(())
    }

    /// Move from `site` to `payment`.
    ///
    /// Inert when no site is chosen; the return value reports whether the
    /// step changed. Calling it again in step `payment` is also a no-op.
    pub fn advance(&mut self) -> bool {
        if self.step == Step::Site && self.selection.site_id.is_some() {
            self.step = Step::Payment;
            true
        } else {
            false
        }
    }

    /// Return to site selection, keeping the selection.
    pub fn back(&mut self) {
        self.step = Step::Site;
    }

    fn ensure_editable(&self) -> Result<(), FlowError> {
        match self.step {
            Step::Site => Ok(()),
            Step::Payment => Err(FlowError::SelectionFrozen),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn site(id: &str) -> Option<SiteId> {
        Some(SiteId::parse(id).unwrap())
    }

    #[test]
    fn test_new_flow_defaults() {
        let flow = CheckoutFlow::new();
        assert_eq!(flow.step(), Step::Site);
        assert_eq!(flow.selection().site_id, None);
        assert_eq!(flow.selection().plan_type, PlanType::Monthly);
    }

    #[test]
    fn test_advance_without_site_is_noop() {
        let mut flow = CheckoutFlow::new();
        flow.select_plan(PlanType::Annual).unwrap();
        let before = flow.clone();

        assert!(!flow.advance());
        assert_eq!(flow, before);
    }

    #[test]
    fn test_advance_with_site_moves_to_payment() {
        let mut flow = CheckoutFlow::new();
        flow.select_site(site("2")).unwrap();
        flow.select_plan(PlanType::Semester).unwrap();

        assert!(flow.advance());
        assert_eq!(flow.step(), Step::Payment);
        assert_eq!(flow.selection().plan_type, PlanType::Semester);
    }

    #[test]
    fn test_selection_frozen_during_payment() {
        let mut flow = CheckoutFlow::new();
        flow.select_site(site("1")).unwrap();
        flow.advance();

        assert_eq!(flow.select_site(site("3")), Err(FlowError::SelectionFrozen));
        assert_eq!(
            flow.select_plan(PlanType::Annual),
            Err(FlowError::SelectionFrozen)
        );
        assert_eq!(flow.selection().site_id, site("1"));
        assert_eq!(flow.selection().plan_type, PlanType::Monthly);
    }

    #[test]
    fn test_back_preserves_selection() {
        let mut flow = CheckoutFlow::new();
        flow.select_site(site("4")).unwrap();
        flow.select_plan(PlanType::Annual).unwrap();
        flow.advance();

        flow.back();
        assert_eq!(flow.step(), Step::Site);
        assert_eq!(flow.selection().site_id, site("4"));
        assert_eq!(flow.selection().plan_type, PlanType::Annual);

        assert!(flow.advance());
        assert_eq!(flow.step(), Step::Payment);
    }

    #[test]
    fn test_derived_price() {
        let catalog = Catalog::builtin();
        let mut selection = Selection::default();
        assert_eq!(selection.price(&catalog), None);

        selection.site_id = site("2");
        selection.plan_type = PlanType::Semester;
        assert_eq!(selection.price(&catalog), Some(Price::whole(650)));

        selection.site_id = site("stale");
        assert!(selection.selected_site(&catalog).is_none());
        assert_eq!(selection.price(&catalog), None);
    }

    #[test]
    fn test_flow_serde_round_trip() {
        let mut flow = CheckoutFlow::new();
        flow.select_site(site("3")).unwrap();
        flow.advance();

        let json = serde_json::to_string(&flow).unwrap();
        assert!(json.contains("\"payment\""));
        let decoded: CheckoutFlow = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, flow);
    }
}
