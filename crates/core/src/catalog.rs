//! Program site catalog.
//!
//! The catalog is fixed at build time and never mutated. Each site carries a
//! price for every [`PlanType`]; [`Pricing`] has one field per plan so a
//! missing plan cannot be expressed.

use serde::{Deserialize, Serialize};

use crate::types::{PlanType, Price, SiteId};

/// Prices for each plan type at a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub monthly: Price,
    pub semester: Price,
    pub annual: Price,
}

impl Pricing {
    /// Create pricing in a const context.
    #[must_use]
    pub const fn whole(monthly: u32, semester: u32, annual: u32) -> Self {
        Self {
            monthly: Price::whole(monthly),
            semester: Price::whole(semester),
            annual: Price::whole(annual),
        }
    }

    /// Price for the given plan type.
    #[must_use]
    pub const fn get(&self, plan: PlanType) -> Price {
        match plan {
            PlanType::Monthly => self.monthly,
            PlanType::Semester => self.semester,
            PlanType::Annual => self.annual,
        }
    }
}

/// A physical program location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    pub name: String,
    /// "City, State"
    pub location: String,
    pub pricing: Pricing,
}

impl Site {
    /// Dropdown label, e.g. `"Hydrate - Bethesda, MD"`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} - {}", self.name, self.location)
    }
}

/// Built-in sites: (id, name, location, pricing).
///
/// Pricing is evaluated at compile time, so a zero price fails the build.
const BUILTIN_SITES: [(&str, &str, &str, Pricing); 4] = [
    (
        "1",
        "Discovery Elementary",
        "Washington, DC",
        Pricing::whole(150, 600, 1100),
    ),
    ("2", "Hydrate", "Bethesda, MD", Pricing::whole(175, 650, 1200)),
    (
        "3",
        "North Site",
        "Silver Spring, MD",
        Pricing::whole(150, 600, 1100),
    ),
    (
        "4",
        "South Site",
        "Alexandria, VA",
        Pricing::whole(165, 625, 1150),
    ),
];

/// Read-only list of sites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    sites: Vec<Site>,
}

impl Catalog {
    /// Build a catalog from an explicit site list.
    #[must_use]
    pub const fn new(sites: Vec<Site>) -> Self {
        Self { sites }
    }

    /// The program's built-in site list.
    #[must_use]
    pub fn builtin() -> Self {
        let sites = BUILTIN_SITES
            .iter()
            .filter_map(|(id, name, location, pricing)| {
                Some(Site {
                    id: SiteId::parse(id).ok()?,
                    name: (*name).to_string(),
                    location: (*location).to_string(),
                    pricing: *pricing,
                })
            })
            .collect();
        Self::new(sites)
    }

    /// All sites in display order.
    #[must_use]
    pub fn sites(&self) -> &[Site] {
        &self.sites
    }

    /// Look up a site by ID.
    #[must_use]
    pub fn find(&self, id: &SiteId) -> Option<&Site> {
        self.sites.iter().find(|site| &site.id == id)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
