//! Campaign Analyzer - coordinator for the five-stage pipeline
//!
//! Runs yield prediction, risk assessment, financial evaluation, scenario
//! simulation and scoring in order for one campaign, plus the Monte Carlo
//! and sensitivity summaries that accompany them. Includes a staged session
//! for driving stages one at a time and a parallel (Rayon) batch entry point.

use crate::config::AnalysisConfig;
use crate::data::ReferenceData;
use crate::error::{AnalysisError, AnalysisResult, Stage};
use crate::inputs::ProjectInputs;
use crate::models::financial::{FinancialEvaluation, FinancialEvaluator};
use crate::models::monte_carlo::{MonteCarloSummary, ProfitDistribution};
use crate::models::risk::{RiskAssessment, RiskEngine};
use crate::models::scenario::{ScenarioResults, ScenarioSimulator, SensitivityPoint, SensitivityVariable};
use crate::models::scoring::{ScoreBreakdown, ScoringEngine};
use crate::models::yield_predictor::{YieldPrediction, YieldPredictor};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;

const SWEEP_VARIABLES: [SensitivityVariable; 3] = [
    SensitivityVariable::Yield,
    SensitivityVariable::Price,
    SensitivityVariable::Joint,
];

/// Standard deviations spanned by the predicted min-max yield range
const RANGE_SIGMAS: f64 = 4.0;

/// Materialized sensitivity sweep for one variable
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivitySweep {
    pub variable: SensitivityVariable,
    pub points: Vec<SensitivityPoint>,
}

/// Everything produced for one campaign
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignAnalysis {
    pub crop: String,
    pub region: String,
    pub prediction: YieldPrediction,
    pub risk: RiskAssessment,
    pub yield_simulation: MonteCarloSummary,
    pub financial: FinancialEvaluation,
    pub scenarios: ScenarioResults,
    pub sensitivity: Vec<SensitivitySweep>,
    pub profit_distribution: ProfitDistribution,
    pub score: ScoreBreakdown,
}

/// Main campaign analyzer
pub struct CampaignAnalyzer {
    reference: Arc<ReferenceData>,
    config: AnalysisConfig,
    predictor: YieldPredictor,
    risk_engine: RiskEngine,
    evaluator: FinancialEvaluator,
    simulator: ScenarioSimulator,
    scorer: ScoringEngine,
}

impl CampaignAnalyzer {
    pub fn new(reference: Arc<ReferenceData>, config: AnalysisConfig) -> Self {
        tracing::info!(
            crops = reference.crop_names().len(),
            regions = reference.region_names().len(),
            discount_rate = config.discount_rate,
            samples = config.monte_carlo_samples,
            seeded = config.seed.is_some(),
            "campaign analyzer initialized"
        );

        Self {
            predictor: YieldPredictor::new(reference.clone()),
            risk_engine: RiskEngine::new(reference.clone()),
            evaluator: FinancialEvaluator::new(),
            simulator: ScenarioSimulator::new(),
            scorer: ScoringEngine::new(),
            reference,
            config,
        }
    }

    /// Analyzer over the built-in reference tables with default settings
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(ReferenceData::builtin()), AnalysisConfig::default())
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Start a staged session for one campaign
    pub fn session<'a>(&'a self, inputs: &'a ProjectInputs) -> AnalysisSession<'a> {
        AnalysisSession {
            analyzer: self,
            inputs,
            prediction: None,
            risk: None,
            financial: None,
            scenarios: None,
            score: None,
        }
    }

    /// Full analysis, seeded from the configuration (or OS entropy)
    pub fn analyze(&self, inputs: &ProjectInputs) -> AnalysisResult<CampaignAnalysis> {
        let mut rng = match self.config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        self.analyze_with_rng(inputs, &mut rng)
    }

    /// Full analysis drawing Monte Carlo samples from `rng`
    pub fn analyze_with_rng<R: Rng + ?Sized>(
        &self,
        inputs: &ProjectInputs,
        rng: &mut R,
    ) -> AnalysisResult<CampaignAnalysis> {
        let mut session = self.session(inputs);
        session.predict_yield()?;
        session.assess_risk()?;
        session.evaluate_financials()?;
        session.simulate_scenarios()?;
        session.score()?;
        let analysis = session.finish(rng)?;

        tracing::info!(
            crop = %analysis.crop,
            region = %analysis.region,
            score = analysis.score.total,
            recommendation = ?analysis.score.recommendation,
            "campaign analysis complete"
        );
        Ok(analysis)
    }

    /// Analyze independent campaigns in parallel
    ///
    /// With a configured seed, request `i` uses `seed + i`, so results do
    /// not depend on thread scheduling.
    pub fn analyze_batch(&self, batch: &[ProjectInputs]) -> Vec<AnalysisResult<CampaignAnalysis>> {
        batch
            .par_iter()
            .enumerate()
            .map(|(i, inputs)| {
                let mut rng = match self.config.seed {
                    Some(seed) => ChaCha8Rng::seed_from_u64(seed.wrapping_add(i as u64)),
                    None => ChaCha8Rng::from_entropy(),
                };
                self.analyze_with_rng(inputs, &mut rng)
            })
            .collect()
    }
}

/// Stage-by-stage driver for one campaign
///
/// Each stage stores its artifact; a stage invoked before its upstream
/// artifact exists fails with `MissingDependency`.
pub struct AnalysisSession<'a> {
    analyzer: &'a CampaignAnalyzer,
    inputs: &'a ProjectInputs,
    prediction: Option<YieldPrediction>,
    risk: Option<RiskAssessment>,
    financial: Option<FinancialEvaluation>,
    scenarios: Option<ScenarioResults>,
    score: Option<ScoreBreakdown>,
}

impl<'a> AnalysisSession<'a> {
    pub fn predict_yield(&mut self) -> AnalysisResult<&YieldPrediction> {
        let prediction = self.analyzer.predictor.predict_for(self.inputs)?;
        tracing::debug!(
            adjustment_factor = prediction.adjustment_factor,
            likely = prediction.likely_kg_ha,
            "stage complete: yield"
        );
        Ok(self.prediction.insert(prediction))
    }

    pub fn assess_risk(&mut self) -> AnalysisResult<&RiskAssessment> {
        let prediction = require(&self.prediction, Stage::Risk, "yield prediction")?;
        let risk = self.analyzer.risk_engine.assess(
            self.inputs.region(),
            self.inputs.crop(),
            prediction,
            Some(self.inputs.expected_price()),
            Some(self.inputs.sowing_month()),
        )?;
        tracing::debug!(ira = risk.ira, category = %risk.category, "stage complete: risk");
        Ok(self.risk.insert(risk))
    }

    pub fn evaluate_financials(&mut self) -> AnalysisResult<&FinancialEvaluation> {
        let prediction = require(&self.prediction, Stage::Financial, "yield prediction")?;
        let financial = self.analyzer.evaluator.evaluate(
            prediction,
            self.inputs.area_ha(),
            self.inputs.expected_price(),
            self.inputs.total_cost(),
            self.inputs.duration_days(),
            self.analyzer.config.discount_rate,
        )?;
        tracing::debug!(npv = financial.npv, irr = ?financial.irr_annual, "stage complete: financial");
        Ok(self.financial.insert(financial))
    }

    pub fn simulate_scenarios(&mut self) -> AnalysisResult<&ScenarioResults> {
        let prediction = require(&self.prediction, Stage::Scenario, "yield prediction")?;
        require(&self.financial, Stage::Scenario, "financial evaluation")?;
        let scenarios = self.analyzer.simulator.run_scenarios(
            prediction,
            self.inputs.expected_price(),
            self.inputs.area_ha(),
            self.inputs.total_cost(),
            self.analyzer.config.discount_rate,
            self.inputs.duration_days(),
            &self.analyzer.config.scenarios,
        )?;
        tracing::debug!(count = scenarios.len(), "stage complete: scenarios");
        Ok(self.scenarios.insert(scenarios))
    }

    pub fn score(&mut self) -> AnalysisResult<&ScoreBreakdown> {
        let financial = require(&self.financial, Stage::Scoring, "financial evaluation")?;
        let risk = require(&self.risk, Stage::Scoring, "risk assessment")?;
        let scenarios = require(&self.scenarios, Stage::Scoring, "scenario results")?;
        let score = self.analyzer.scorer.score(financial, risk, scenarios)?;
        tracing::debug!(total = score.total, "stage complete: scoring");
        Ok(self.score.insert(score))
    }

    pub fn prediction(&self) -> Option<&YieldPrediction> {
        self.prediction.as_ref()
    }

    pub fn risk(&self) -> Option<&RiskAssessment> {
        self.risk.as_ref()
    }

    pub fn financial(&self) -> Option<&FinancialEvaluation> {
        self.financial.as_ref()
    }

    pub fn scenarios(&self) -> Option<&ScenarioResults> {
        self.scenarios.as_ref()
    }

    /// Add the Monte Carlo and sensitivity summaries and bundle every artifact
    pub fn finish<R: Rng + ?Sized>(self, rng: &mut R) -> AnalysisResult<CampaignAnalysis> {
        let prediction = self
            .prediction
            .ok_or_else(|| AnalysisError::missing(Stage::Scoring, "yield prediction"))?;
        let risk = self
            .risk
            .ok_or_else(|| AnalysisError::missing(Stage::Scoring, "risk assessment"))?;
        let financial = self
            .financial
            .ok_or_else(|| AnalysisError::missing(Stage::Scoring, "financial evaluation"))?;
        let scenarios = self
            .scenarios
            .ok_or_else(|| AnalysisError::missing(Stage::Scoring, "scenario results"))?;
        let score = self
            .score
            .ok_or_else(|| AnalysisError::missing(Stage::Scoring, "score"))?;

        let analyzer = self.analyzer;
        let inputs = self.inputs;
        let config = &analyzer.config;

        let yield_volatility = yield_volatility(&prediction);
        let yield_simulation = analyzer.risk_engine.simulate(
            prediction.likely_kg_ha,
            yield_volatility,
            config.monte_carlo_samples,
            rng,
        )?;
        let profit_distribution = analyzer.simulator.simulate_profit(
            prediction.likely_kg_ha,
            inputs.expected_price(),
            inputs.area_ha(),
            inputs.total_cost(),
            yield_volatility,
            risk.market.volatility,
            config.monte_carlo_samples,
            rng,
        )?;

        let sensitivity = SWEEP_VARIABLES
            .iter()
            .map(|&variable| {
                let curve = analyzer.simulator.sweep(
                    &prediction,
                    inputs.expected_price(),
                    inputs.area_ha(),
                    inputs.total_cost(),
                    config.discount_rate,
                    inputs.duration_days(),
                    variable,
                    config.sweep,
                )?;
                Ok(SensitivitySweep {
                    variable,
                    points: curve.iter().collect(),
                })
            })
            .collect::<AnalysisResult<Vec<_>>>()?;

        Ok(CampaignAnalysis {
            crop: prediction.crop.clone(),
            region: inputs.region().to_string(),
            prediction,
            risk,
            yield_simulation,
            financial,
            scenarios,
            sensitivity,
            profit_distribution,
            score,
        })
    }
}

/// Relative yield standard deviation implied by the predicted range
///
/// The min-max range is read as ±2σ around the likely yield, so the
/// volatility is a quarter of the range's coefficient of variation.
fn yield_volatility(prediction: &YieldPrediction) -> f64 {
    if prediction.likely_kg_ha > 0.0 {
        (prediction.max_kg_ha - prediction.min_kg_ha) / (RANGE_SIGMAS * prediction.likely_kg_ha)
    } else {
        0.0
    }
}

fn require<'s, T>(artifact: &'s Option<T>, stage: Stage, name: &'static str) -> AnalysisResult<&'s T> {
    artifact.as_ref().ok_or_else(|| AnalysisError::missing(stage, name))
}
