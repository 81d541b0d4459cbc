//! Campaign Scorer
//!
//! Go/no-go analysis for a single agricultural campaign (crop, region, area,
//! costs, expected sale price), chaining four numeric models into a weighted
//! 0-100 score:
//!
//! - `models/yield_predictor`: agronomic inputs → yield range
//! - `models/risk`: climate, market and production risk → IRA
//! - `models/financial`: cash-flow schedule → NPV, IRR, break-even, payback
//! - `models/scenario`: named scenarios, sensitivity sweeps, joint Monte Carlo
//! - `models/scoring`: four criteria → score and recommendation
//!
//! `pipeline::CampaignAnalyzer` runs the stages in order over shared,
//! read-only reference data. The library logs through `tracing` and never
//! installs a subscriber.

pub mod config;
pub mod data;
pub mod error;
pub mod inputs;
pub mod models;
pub mod pipeline;
pub mod utils;

// Re-export commonly used types
pub use config::AnalysisConfig;
pub use data::{CropReference, ReferenceData, RegionReference};
pub use error::{AnalysisError, AnalysisResult, Stage};
pub use inputs::{AgronomicInputs, CostBreakdown, ProjectInputs};
pub use models::*;
pub use pipeline::{AnalysisSession, CampaignAnalysis, CampaignAnalyzer, SensitivitySweep};
pub use utils::RiskCategory;
