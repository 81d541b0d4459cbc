//! Scenario Simulator
//!
//! Re-evaluates the campaign under named yield/price multipliers, sweeps NPV
//! across perturbations of yield, price or both, and summarizes the joint
//! Monte Carlo profit distribution.
//!
//! Every scenario and sweep point is a fresh evaluation from the original
//! inputs. Nothing is chained from a previous scenario.

use crate::error::{ensure_non_negative, ensure_positive, AnalysisError, AnalysisResult, Stage};
use crate::models::financial::{CashFlowSchedule, FinancialEvaluation, FinancialEvaluator};
use crate::models::monte_carlo::{self, ProfitDistribution};
use crate::models::yield_predictor::YieldPrediction;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const PESSIMISTIC: &str = "Pessimistic";
pub const BASE: &str = "Base";
pub const OPTIMISTIC: &str = "Optimistic";

pub const DEFAULT_BIVARIATE_VARIATIONS: [f64; 7] = [-30.0, -20.0, -10.0, 0.0, 10.0, 20.0, 30.0];

/// Tolerance on the sum of outcome probabilities
const PROBABILITY_SUM_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub yield_multiplier: f64,
    pub price_multiplier: f64,
    #[serde(default)]
    pub description: String,
}

impl Scenario {
    pub fn new(name: &str, yield_multiplier: f64, price_multiplier: f64, description: &str) -> Self {
        Self {
            name: name.to_string(),
            yield_multiplier,
            price_multiplier,
            description: description.to_string(),
        }
    }
}

/// Ordered set of scenarios to evaluate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScenarioSet {
    scenarios: Vec<Scenario>,
}

impl Default for ScenarioSet {
    fn default() -> Self {
        Self {
            scenarios: vec![
                Scenario::new(PESSIMISTIC, 0.80, 0.85, "Unfavourable conditions"),
                Scenario::new(BASE, 1.00, 1.00, "Expected conditions"),
                Scenario::new(OPTIMISTIC, 1.20, 1.15, "Favourable conditions"),
            ],
        }
    }
}

impl ScenarioSet {
    pub fn new(scenarios: Vec<Scenario>) -> Self {
        Self { scenarios }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.iter()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    pub(crate) fn validate(&self) -> AnalysisResult<()> {
        for (i, scenario) in self.scenarios.iter().enumerate() {
            ensure_positive(Stage::Scenario, "yield multiplier", scenario.yield_multiplier)?;
            ensure_positive(Stage::Scenario, "price multiplier", scenario.price_multiplier)?;
            if self.scenarios[..i].iter().any(|s| s.name == scenario.name) {
                return Err(AnalysisError::invalid(
                    Stage::Scenario,
                    "scenario name",
                    format!("'{}' appears more than once", scenario.name),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioResult {
    pub name: String,
    pub description: String,
    pub yield_multiplier: f64,
    pub price_multiplier: f64,
    pub yield_kg_ha: f64,
    pub price: f64,
    pub production_kg: f64,
    pub evaluation: FinancialEvaluation,
}

/// Scenario results in evaluation order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScenarioResults {
    results: Vec<ScenarioResult>,
}

impl ScenarioResults {
    pub fn get(&self, name: &str) -> Option<&ScenarioResult> {
        self.results.iter().find(|r| r.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensitivityVariable {
    Yield,
    Price,
    /// Yield and price perturbed by the same percentage
    Joint,
}

/// Perturbation range for sensitivity sweeps, in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepSettings {
    pub min_pct: f64,
    pub max_pct: f64,
    pub steps: usize,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            min_pct: -40.0,
            max_pct: 40.0,
            steps: 9,
        }
    }
}

impl SweepSettings {
    pub(crate) fn validate(&self) -> AnalysisResult<()> {
        if self.min_pct <= -100.0 {
            return Err(AnalysisError::invalid(
                Stage::Scenario,
                "sweep range",
                "lower bound must stay above -100%",
            ));
        }
        if self.min_pct > self.max_pct {
            return Err(AnalysisError::invalid(
                Stage::Scenario,
                "sweep range",
                "lower bound exceeds upper bound",
            ));
        }
        if self.steps < 2 {
            return Err(AnalysisError::invalid(Stage::Scenario, "sweep steps", "must be at least 2"));
        }
        Ok(())
    }

    fn perturbation(&self, index: usize) -> f64 {
        let span = self.max_pct - self.min_pct;
        self.min_pct + span * index as f64 / (self.steps - 1) as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensitivityPoint {
    pub perturbation_pct: f64,
    pub npv: f64,
    pub profit: f64,
}

/// Lazily evaluated NPV sweep
///
/// Each call to `iter` starts again from the lower bound.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivityCurve {
    variable: SensitivityVariable,
    settings: SweepSettings,
    yield_kg_ha: f64,
    price: f64,
    area_ha: f64,
    total_cost: f64,
    duration_days: u32,
    monthly_rate: f64,
}

impl SensitivityCurve {
    pub fn variable(&self) -> SensitivityVariable {
        self.variable
    }

    pub fn len(&self) -> usize {
        self.settings.steps
    }

    pub fn is_empty(&self) -> bool {
        self.settings.steps == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = SensitivityPoint> + '_ {
        (0..self.settings.steps).map(move |i| self.point(self.settings.perturbation(i)))
    }

    fn point(&self, perturbation_pct: f64) -> SensitivityPoint {
        let factor = 1.0 + perturbation_pct / 100.0;
        let (yield_factor, price_factor) = match self.variable {
            SensitivityVariable::Yield => (factor, 1.0),
            SensitivityVariable::Price => (1.0, factor),
            SensitivityVariable::Joint => (factor, factor),
        };
        let revenue = self.yield_kg_ha * yield_factor * self.area_ha * self.price * price_factor;
        let schedule = CashFlowSchedule::build(self.total_cost, revenue, self.duration_days);

        SensitivityPoint {
            perturbation_pct,
            npv: schedule.npv(self.monthly_rate),
            profit: revenue - self.total_cost,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BivariateCell {
    pub yield_variation_pct: f64,
    pub price_variation_pct: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExpectedValue {
    pub value: f64,
    pub outcomes: usize,
    pub probability_sum: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScenarioSimulator {
    evaluator: FinancialEvaluator,
}

impl ScenarioSimulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full financial evaluation for each scenario in `set`
    #[allow(clippy::too_many_arguments)]
    pub fn run_scenarios(
        &self,
        prediction: &YieldPrediction,
        price: f64,
        area_ha: f64,
        total_cost: f64,
        annual_rate: f64,
        duration_days: u32,
        set: &ScenarioSet,
    ) -> AnalysisResult<ScenarioResults> {
        set.validate()?;

        let results = set
            .iter()
            .map(|scenario| {
                let scaled = prediction.scaled(scenario.yield_multiplier);
                let adjusted_price = price * scenario.price_multiplier;
                let evaluation =
                    self.evaluator
                        .evaluate(&scaled, area_ha, adjusted_price, total_cost, duration_days, annual_rate)?;

                tracing::debug!(scenario = %scenario.name, npv = evaluation.npv, "scenario evaluated");

                Ok(ScenarioResult {
                    name: scenario.name.clone(),
                    description: scenario.description.clone(),
                    yield_multiplier: scenario.yield_multiplier,
                    price_multiplier: scenario.price_multiplier,
                    yield_kg_ha: scaled.likely_kg_ha,
                    price: adjusted_price,
                    production_kg: evaluation.production_kg,
                    evaluation,
                })
            })
            .collect::<AnalysisResult<Vec<_>>>()?;

        Ok(ScenarioResults { results })
    }

    /// NPV sweep over one variable (or both) with the rest held fixed
    #[allow(clippy::too_many_arguments)]
    pub fn sweep(
        &self,
        prediction: &YieldPrediction,
        price: f64,
        area_ha: f64,
        total_cost: f64,
        annual_rate: f64,
        duration_days: u32,
        variable: SensitivityVariable,
        settings: SweepSettings,
    ) -> AnalysisResult<SensitivityCurve> {
        settings.validate()?;
        ensure_positive(Stage::Scenario, "price", price)?;
        ensure_positive(Stage::Scenario, "area", area_ha)?;
        ensure_non_negative(Stage::Scenario, "total cost", total_cost)?;
        ensure_non_negative(Stage::Scenario, "discount rate", annual_rate)?;

        Ok(SensitivityCurve {
            variable,
            settings,
            yield_kg_ha: prediction.likely_kg_ha,
            price,
            area_ha,
            total_cost,
            duration_days,
            monthly_rate: annual_rate / 12.0,
        })
    }

    /// Joint yield × price Monte Carlo of campaign profit
    #[allow(clippy::too_many_arguments)]
    pub fn simulate_profit<R: Rng + ?Sized>(
        &self,
        yield_mean: f64,
        price_mean: f64,
        area_ha: f64,
        total_cost: f64,
        yield_volatility: f64,
        price_volatility: f64,
        samples: usize,
        rng: &mut R,
    ) -> AnalysisResult<ProfitDistribution> {
        monte_carlo::simulate_profit(
            yield_mean,
            price_mean,
            area_ha,
            total_cost,
            yield_volatility,
            price_volatility,
            samples,
            rng,
        )
    }

    /// Profit grid over yield and price variations (percent)
    pub fn bivariate_sensitivity(
        &self,
        yield_kg_ha: f64,
        price: f64,
        area_ha: f64,
        total_cost: f64,
        yield_variations: &[f64],
        price_variations: &[f64],
    ) -> Vec<BivariateCell> {
        yield_variations
            .iter()
            .flat_map(|&yv| {
                price_variations.iter().map(move |&pv| {
                    let revenue = yield_kg_ha * (1.0 + yv / 100.0) * area_ha * price * (1.0 + pv / 100.0);
                    BivariateCell {
                        yield_variation_pct: yv,
                        price_variation_pct: pv,
                        profit: revenue - total_cost,
                    }
                })
            })
            .collect()
    }

    /// Probability-weighted value of (outcome, probability) pairs
    pub fn expected_value(&self, outcomes: &[(f64, f64)]) -> AnalysisResult<ExpectedValue> {
        let probability_sum: f64 = outcomes.iter().map(|(_, p)| p).sum();
        if (probability_sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            return Err(AnalysisError::invalid(
                Stage::Scenario,
                "probabilities",
                format!("must sum to 1.0 (sum is {})", probability_sum),
            ));
        }

        Ok(ExpectedValue {
            value: outcomes.iter().map(|(value, p)| value * p).sum(),
            outcomes: outcomes.len(),
            probability_sum,
        })
    }
}
