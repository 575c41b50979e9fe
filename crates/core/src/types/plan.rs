//! Billing cadence for a registration.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when parsing an unknown plan type.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown plan type: {0}")]
pub struct PlanTypeError(pub String);

/// Payment plan type.
///
/// Serialized lowercase (`"monthly"`, `"semester"`, `"annual"`), which is
/// also the value posted by the plan radio buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    #[default]
    Monthly,
    Semester,
    Annual,
}

impl PlanType {
    /// All plan types in display order.
    pub const ALL: [Self; 3] = [Self::Monthly, Self::Semester, Self::Annual];

    /// Wire/form value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Semester => "semester",
            Self::Annual => "annual",
        }
    }

    /// Capitalized display label.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Monthly => "Monthly",
            Self::Semester => "Semester",
            Self::Annual => "Annual",
        }
    }

    /// Suffix shown after the price in the plan picker (e.g. `$150/month`).
    #[must_use]
    pub const fn cadence(&self) -> &'static str {
        match self {
            Self::Monthly => "/month",
            Self::Semester => " per semester",
            Self::Annual => " per year",
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlanType {
    type Err = PlanTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(Self::Monthly),
            "semester" => Ok(Self::Semester),
            "annual" => Ok(Self::Annual),
            other => Err(PlanTypeError(other.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_monthly() {
        assert_eq!(PlanType::default(), PlanType::Monthly);
    }

    #[test]
    fn test_parse_round_trips_form_values() {
        for plan in PlanType::ALL {
            assert_eq!(plan.as_str().parse::<PlanType>().unwrap(), plan);
        }
        assert!("weekly".parse::<PlanType>().is_err());
        assert!("Monthly".parse::<PlanType>().is_err());
    }

    #[test]
    fn test_label_is_capitalized() {
        assert_eq!(PlanType::Semester.label(), "Semester");
        assert_eq!(PlanType::Annual.label(), "Annual");
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&PlanType::Semester).unwrap(),
            "\"semester\""
        );
        assert!(serde_json::from_str::<PlanType>("\"yearly\"").is_err());
    }
}
