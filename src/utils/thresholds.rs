//! Three-tier risk categorization
//!
//! The same cut points apply to the composite IRA and to every sub-risk.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const LOW_RISK_THRESHOLD: f64 = 0.33;
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.67;

/// Risk severity, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskCategory {
    Low,
    Medium,
    High,
}

impl RiskCategory {
    /// < 0.33 → Low, < 0.67 → Medium, else High
    pub fn from_value(value: f64) -> Self {
        match value {
            v if v < LOW_RISK_THRESHOLD => RiskCategory::Low,
            v if v < MEDIUM_RISK_THRESHOLD => RiskCategory::Medium,
            _ => RiskCategory::High,
        }
    }

    pub fn display_text(&self) -> &'static str {
        match self {
            RiskCategory::Low => "LOW",
            RiskCategory::Medium => "MEDIUM",
            RiskCategory::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cut_points() {
        assert_eq!(RiskCategory::from_value(0.0), RiskCategory::Low);
        assert_eq!(RiskCategory::from_value(0.3299), RiskCategory::Low);
        assert_eq!(RiskCategory::from_value(0.33), RiskCategory::Medium);
        assert_eq!(RiskCategory::from_value(0.6699), RiskCategory::Medium);
        assert_eq!(RiskCategory::from_value(0.67), RiskCategory::High);
        assert_eq!(RiskCategory::from_value(1.2), RiskCategory::High);
    }

    #[test]
    fn test_categorization_is_monotonic() {
        let mut previous = RiskCategory::Low;
        for step in 0..=1200 {
            let value = step as f64 / 1000.0;
            let category = RiskCategory::from_value(value);
            assert!(category >= previous, "category decreased at {}", value);
            previous = category;
        }
    }
}
