//! Error taxonomy for the analysis pipeline
//!
//! Fatal conditions abort a run and carry the stage and field that caused
//! them. Results that simply do not exist (an IRR without a real root, a
//! payback period never reached) are modelled as `Option` fields instead.

use std::fmt;
use thiserror::Error;

/// Pipeline stage, used to give errors a precise origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Stage {
    Inputs,
    Yield,
    Risk,
    Financial,
    Scenario,
    Scoring,
}

impl Stage {
    pub fn display_text(&self) -> &'static str {
        match self {
            Stage::Inputs => "inputs",
            Stage::Yield => "yield prediction",
            Stage::Risk => "risk assessment",
            Stage::Financial => "financial evaluation",
            Stage::Scenario => "scenario simulation",
            Stage::Scoring => "scoring",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_text())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    /// Unknown reference key (crop). Regions never produce this.
    #[error("{kind} '{id}' not found in reference data")]
    NotFound { kind: &'static str, id: String },

    #[error("invalid input for {stage}: {field} {reason}")]
    InvalidInput {
        stage: Stage,
        field: &'static str,
        reason: String,
    },

    /// A stage was invoked before the artifact it consumes was produced
    #[error("{stage} requires {artifact}, which has not been produced")]
    MissingDependency {
        stage: Stage,
        artifact: &'static str,
    },
}

impl AnalysisError {
    pub fn crop_not_found(id: &str) -> Self {
        AnalysisError::NotFound {
            kind: "crop",
            id: id.to_string(),
        }
    }

    pub fn invalid(stage: Stage, field: &'static str, reason: impl Into<String>) -> Self {
        AnalysisError::InvalidInput {
            stage,
            field,
            reason: reason.into(),
        }
    }

    pub fn missing(stage: Stage, artifact: &'static str) -> Self {
        AnalysisError::MissingDependency { stage, artifact }
    }

    /// Stage the error originated from, when it is known
    pub fn stage(&self) -> Option<Stage> {
        match self {
            AnalysisError::NotFound { .. } => None,
            AnalysisError::InvalidInput { stage, .. } => Some(*stage),
            AnalysisError::MissingDependency { stage, .. } => Some(*stage),
        }
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Reject values that are not strictly positive (also rejects NaN)
pub(crate) fn ensure_positive(stage: Stage, field: &'static str, value: f64) -> AnalysisResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(AnalysisError::invalid(stage, field, format!("must be > 0 (got {})", value)))
    }
}

/// Reject negative or non-finite values
pub(crate) fn ensure_non_negative(stage: Stage, field: &'static str, value: f64) -> AnalysisResult<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(AnalysisError::invalid(stage, field, format!("must be >= 0 (got {})", value)))
    }
}

/// Reject values outside the inclusive range [min, max]
pub(crate) fn ensure_in_range(
    stage: Stage,
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> AnalysisResult<()> {
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(AnalysisError::invalid(
            stage,
            field,
            format!("must be within [{}, {}] (got {})", min, max, value),
        ))
    }
}

pub(crate) fn ensure_month(stage: Stage, field: &'static str, month: u32) -> AnalysisResult<()> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(AnalysisError::invalid(stage, field, format!("must be a month 1-12 (got {})", month)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = AnalysisError::invalid(Stage::Financial, "price", "must be > 0 (got 0)");
        assert_eq!(
            err.to_string(),
            "invalid input for financial evaluation: price must be > 0 (got 0)"
        );
        assert_eq!(err.stage(), Some(Stage::Financial));

        let err = AnalysisError::missing(Stage::Scoring, "risk assessment");
        assert_eq!(
            err.to_string(),
            "scoring requires risk assessment, which has not been produced"
        );

        let err = AnalysisError::crop_not_found("Mango");
        assert_eq!(err.to_string(), "crop 'Mango' not found in reference data");
        assert_eq!(err.stage(), None);
    }

    #[test]
    fn test_guards() {
        assert!(ensure_positive(Stage::Inputs, "area", 1.0).is_ok());
        assert!(ensure_positive(Stage::Inputs, "area", 0.0).is_err());
        assert!(ensure_positive(Stage::Inputs, "area", f64::NAN).is_err());
        assert!(ensure_non_negative(Stage::Inputs, "labor", 0.0).is_ok());
        assert!(ensure_non_negative(Stage::Inputs, "labor", -0.01).is_err());
        assert!(ensure_in_range(Stage::Yield, "soil", 10.0, 1.0, 10.0).is_ok());
        assert!(ensure_in_range(Stage::Yield, "soil", 10.5, 1.0, 10.0).is_err());
        assert!(ensure_month(Stage::Risk, "sowing_month", 12).is_ok());
        assert!(ensure_month(Stage::Risk, "sowing_month", 0).is_err());
    }
}
