//! Monte Carlo simulation of yield and profit
//!
//! Draws are normal around the expected value with standard deviation
//! `mean · volatility`, floored at 30% of the mean so no sample goes
//! negative. The random source is always supplied by the caller; seeding a
//! `ChaCha8Rng` gives reproducible summaries.

use crate::error::{ensure_non_negative, ensure_positive, AnalysisError, AnalysisResult, Stage};
use crate::utils::stats::{fraction_where, mean, percentile_sorted, sorted, std_dev};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;

/// Samples are never drawn below this fraction of the mean
pub const SAMPLE_FLOOR_FRACTION: f64 = 0.3;

/// A yield sample below this fraction of `likely` counts as a shortfall
pub const SHORTFALL_FRACTION: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonteCarloSummary {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub p5: f64,
    pub p95: f64,
    /// Fraction of samples below 80% of the expected yield
    pub shortfall_probability: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitDistribution {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub p5: f64,
    pub p25: f64,
    pub p75: f64,
    pub p95: f64,
    /// P(profit < 0)
    pub loss_probability: f64,
    /// P(profit < 0.5 · mean)
    pub low_profit_probability: f64,
    /// P(profit > 1.5 · mean)
    pub high_profit_probability: f64,
    pub samples: usize,
}

/// Simulate `samples` yields around `likely_kg_ha`
pub fn simulate_yield<R: Rng + ?Sized>(
    likely_kg_ha: f64,
    volatility: f64,
    samples: usize,
    rng: &mut R,
) -> AnalysisResult<MonteCarloSummary> {
    ensure_samples(Stage::Risk, samples)?;
    ensure_positive(Stage::Risk, "expected yield", likely_kg_ha)?;

    let draws = FlooredNormal::new(Stage::Risk, likely_kg_ha, volatility)?;
    let values: Vec<f64> = (0..samples).map(|_| draws.sample(rng)).collect();
    let ordered = sorted(&values);

    Ok(MonteCarloSummary {
        mean: mean(&values),
        median: percentile_sorted(&ordered, 50.0),
        std_dev: std_dev(&values),
        p5: percentile_sorted(&ordered, 5.0),
        p95: percentile_sorted(&ordered, 95.0),
        shortfall_probability: fraction_where(&values, |v| v < likely_kg_ha * SHORTFALL_FRACTION),
        samples,
    })
}

/// Joint yield × price simulation of campaign profit
///
/// Yield and price are drawn independently; profit = yield · area · price − cost.
#[allow(clippy::too_many_arguments)]
pub fn simulate_profit<R: Rng + ?Sized>(
    yield_mean: f64,
    price_mean: f64,
    area_ha: f64,
    total_cost: f64,
    yield_volatility: f64,
    price_volatility: f64,
    samples: usize,
    rng: &mut R,
) -> AnalysisResult<ProfitDistribution> {
    ensure_samples(Stage::Scenario, samples)?;
    ensure_positive(Stage::Scenario, "yield", yield_mean)?;
    ensure_positive(Stage::Scenario, "price", price_mean)?;
    ensure_positive(Stage::Scenario, "area", area_ha)?;
    ensure_non_negative(Stage::Scenario, "total cost", total_cost)?;

    let yields = FlooredNormal::new(Stage::Scenario, yield_mean, yield_volatility)?;
    let prices = FlooredNormal::new(Stage::Scenario, price_mean, price_volatility)?;

    let profits: Vec<f64> = (0..samples)
        .map(|_| {
            let y = yields.sample(rng);
            let p = prices.sample(rng);
            y * area_ha * p - total_cost
        })
        .collect();
    let ordered = sorted(&profits);
    let average = mean(&profits);

    Ok(ProfitDistribution {
        mean: average,
        median: percentile_sorted(&ordered, 50.0),
        std_dev: std_dev(&profits),
        p5: percentile_sorted(&ordered, 5.0),
        p25: percentile_sorted(&ordered, 25.0),
        p75: percentile_sorted(&ordered, 75.0),
        p95: percentile_sorted(&ordered, 95.0),
        loss_probability: fraction_where(&profits, |v| v < 0.0),
        low_profit_probability: fraction_where(&profits, |v| v < average * 0.5),
        high_profit_probability: fraction_where(&profits, |v| v > average * 1.5),
        samples,
    })
}

fn ensure_samples(stage: Stage, samples: usize) -> AnalysisResult<()> {
    if samples == 0 {
        return Err(AnalysisError::invalid(stage, "sample count", "must be at least 1"));
    }
    Ok(())
}

/// Normal(mean, mean · volatility) clipped below at 30% of the mean
struct FlooredNormal {
    normal: Normal<f64>,
    floor: f64,
}

impl FlooredNormal {
    fn new(stage: Stage, mean: f64, volatility: f64) -> AnalysisResult<Self> {
        ensure_non_negative(stage, "volatility", volatility)?;
        let normal = Normal::new(mean, mean * volatility)
            .map_err(|e| AnalysisError::invalid(stage, "volatility", e.to_string()))?;
        Ok(Self {
            normal,
            floor: mean * SAMPLE_FLOOR_FRACTION,
        })
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.normal.sample(rng).max(self.floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_zero_samples_is_invalid() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let err = simulate_yield(5000.0, 0.2, 0, &mut rng).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput { stage: Stage::Risk, .. }));

        let err = simulate_profit(5000.0, 2.0, 1.0, 1000.0, 0.2, 0.2, 0, &mut rng).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidInput { stage: Stage::Scenario, .. }));
    }

    #[test]
    fn test_same_seed_same_summary() {
        let mut a = ChaCha8Rng::seed_from_u64(42);
        let mut b = ChaCha8Rng::seed_from_u64(42);
        let first = simulate_yield(4860.0, 0.25, 1000, &mut a).unwrap();
        let second = simulate_yield(4860.0, 0.25, 1000, &mut b).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_yield_summary_is_plausible() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let summary = simulate_yield(5000.0, 0.1, 5000, &mut rng).unwrap();

        assert_eq!(summary.samples, 5000);
        assert_relative_eq!(summary.mean, 5000.0, max_relative = 0.02);
        assert_relative_eq!(summary.std_dev, 500.0, max_relative = 0.1);
        assert!(summary.p5 < summary.median && summary.median < summary.p95);
        // 0.8·likely is two standard deviations below the mean
        assert!(summary.shortfall_probability < 0.05);
    }

    #[test]
    fn test_samples_are_floored() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let summary = simulate_yield(1000.0, 2.0, 2000, &mut rng).unwrap();
        assert!(summary.p5 >= 300.0);
    }

    #[test]
    fn test_zero_volatility_is_deterministic() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let summary = simulate_yield(1000.0, 0.0, 10, &mut rng).unwrap();
        assert_eq!(summary.mean, 1000.0);
        assert_eq!(summary.std_dev, 0.0);
        assert_eq!(summary.shortfall_probability, 0.0);

        let profit = simulate_profit(1000.0, 2.0, 3.0, 1000.0, 0.0, 0.0, 10, &mut rng).unwrap();
        assert_eq!(profit.mean, 5000.0);
        assert_eq!(profit.loss_probability, 0.0);
    }

    #[test]
    fn test_profit_distribution_loss_probability() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        // Expected revenue equals cost, so roughly half the draws lose money
        let profit = simulate_profit(1000.0, 1.0, 10.0, 10_000.0, 0.2, 0.2, 4000, &mut rng).unwrap();
        assert!(profit.loss_probability > 0.35 && profit.loss_probability < 0.65);
        assert!(profit.p5 <= profit.p25 && profit.p25 <= profit.median);
        assert!(profit.median <= profit.p75 && profit.p75 <= profit.p95);
    }

    #[test]
    fn test_negative_volatility_is_invalid() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(simulate_yield(1000.0, -0.1, 10, &mut rng).is_err());
    }
}
