//! Utility modules shared across models
//!
//! - Statistics: mean, standard deviation, interpolated percentiles
//! - Thresholds: three-tier risk categorization

pub mod stats;
pub mod thresholds;

// Re-export commonly used types
pub use stats::{fraction_where, mean, percentile_sorted, sorted, std_dev};
pub use thresholds::{RiskCategory, LOW_RISK_THRESHOLD, MEDIUM_RISK_THRESHOLD};
