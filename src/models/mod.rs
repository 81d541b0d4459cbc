//! Numeric models of the campaign pipeline
//!
//! Each stage lives in its own module; later stages consume the artifacts
//! of earlier ones and never call back into them.

pub mod financial;
pub mod monte_carlo;
pub mod risk;
pub mod scenario;
pub mod scoring;
pub mod yield_predictor;

// Re-export stage entry points and artifacts
pub use financial::{CashFlowSchedule, FinancialEvaluation, FinancialEvaluator, FinancialRatios};
pub use monte_carlo::{simulate_profit, simulate_yield, MonteCarloSummary, ProfitDistribution};
pub use risk::{heat_map, AttentionLevel, MitigationOutcome, RiskAssessment, RiskEngine};
pub use scenario::{
    Scenario, ScenarioResult, ScenarioResults, ScenarioSet, ScenarioSimulator, SensitivityCurve,
    SensitivityPoint, SensitivityVariable, SweepSettings,
};
pub use scoring::{
    quick_recommendation, ConfidenceLevel, QuickRecommendation, RecommendationCategory, ScoreBreakdown,
    ScoringEngine,
};
pub use yield_predictor::{Confidence, YieldGap, YieldPrediction, YieldPredictor};
