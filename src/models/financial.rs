//! Financial Evaluator
//!
//! Discounted cash-flow evaluation of one campaign: revenue, profit, margin,
//! ROI, NPV, IRR, break-even and payback.
//!
//! The cash-flow schedule has one period per 30 days of campaign:
//!
//!   period 0        = −0.3·C
//!   periods 1..m−1  = −0.7·C/(m−1)
//!   period m        = revenue − 0.7·C/(m−1)      (revenue alone when m = 1)
//!
//! NPV discounts at `annual_rate / 12` starting from period 0.

use crate::error::{ensure_non_negative, ensure_positive, AnalysisError, AnalysisResult, Stage};
use crate::models::yield_predictor::YieldPrediction;
use serde::Serialize;

pub const UPFRONT_COST_SHARE: f64 = 0.3;
pub const DAYS_PER_PERIOD: u32 = 30;

const IRR_TOLERANCE: f64 = 1e-10;
const IRR_MAX_ITERATIONS: usize = 100;
const BISECTION_ITERATIONS: usize = 200;

/// Rates scanned for a sign change when Newton-Raphson fails
const IRR_SCAN_LOWER: f64 = -0.99;
const IRR_SCAN_UPPER: f64 = 10.0;
const IRR_SCAN_STEPS: usize = 400;

/// Ordered per-period net cash amounts
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashFlowSchedule {
    flows: Vec<f64>,
}

impl CashFlowSchedule {
    pub fn new(flows: Vec<f64>) -> Self {
        Self { flows }
    }

    /// Standard campaign schedule for `duration_days`
    pub fn build(total_cost: f64, revenue: f64, duration_days: u32) -> Self {
        let months = duration_months(duration_days);
        let mut flows = Vec::with_capacity(months + 1);
        flows.push(-UPFRONT_COST_SHARE * total_cost);

        if months > 1 {
            let monthly = (1.0 - UPFRONT_COST_SHARE) * total_cost / (months - 1) as f64;
            flows.extend(std::iter::repeat(-monthly).take(months - 1));
            flows.push(revenue - monthly);
        } else {
            flows.push(revenue);
        }

        Self { flows }
    }

    pub fn flows(&self) -> &[f64] {
        &self.flows
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Present value at a per-period rate
    pub fn npv(&self, rate: f64) -> f64 {
        self.flows
            .iter()
            .enumerate()
            .map(|(t, flow)| flow / (1.0 + rate).powi(t as i32))
            .sum()
    }

    fn npv_derivative(&self, rate: f64) -> f64 {
        self.flows
            .iter()
            .enumerate()
            .skip(1)
            .map(|(t, flow)| -(t as f64) * flow / (1.0 + rate).powi(t as i32 + 1))
            .sum()
    }

    /// Per-period internal rate of return
    ///
    /// Newton-Raphson from 10%, then bisection over the first bracket found
    /// by scanning (−99%, 1000%]. `None` when the flows never change sign or
    /// no root is found.
    pub fn irr_monthly(&self) -> Option<f64> {
        let has_negative = self.flows.iter().any(|f| *f < 0.0);
        let has_positive = self.flows.iter().any(|f| *f > 0.0);
        if !has_negative || !has_positive {
            return None;
        }

        self.irr_newton().or_else(|| self.irr_bisection())
    }

    fn irr_newton(&self) -> Option<f64> {
        let mut rate = 0.1;
        for _ in 0..IRR_MAX_ITERATIONS {
            let value = self.npv(rate);
            if value.abs() < IRR_TOLERANCE {
                return Some(rate);
            }
            let slope = self.npv_derivative(rate);
            if slope.abs() < 1e-14 {
                return None;
            }
            let next = rate - value / slope;
            if !next.is_finite() || next <= -1.0 {
                return None;
            }
            if (next - rate).abs() <= 1e-12 * (1.0 + rate.abs()) {
                return Some(next);
            }
            rate = next;
        }
        None
    }

    fn irr_bisection(&self) -> Option<f64> {
        let step = (IRR_SCAN_UPPER - IRR_SCAN_LOWER) / IRR_SCAN_STEPS as f64;
        let mut low = IRR_SCAN_LOWER;
        let mut low_value = self.npv(low);

        for i in 1..=IRR_SCAN_STEPS {
            let high = IRR_SCAN_LOWER + step * i as f64;
            let high_value = self.npv(high);

            if low_value == 0.0 {
                return Some(low);
            }
            if low_value.signum() != high_value.signum() {
                return Some(bisect(|r| self.npv(r), low, high));
            }
            low = high;
            low_value = high_value;
        }
        None
    }

    /// First period whose cumulative cash flow is non-negative
    pub fn payback_period(&self) -> Option<usize> {
        self.cumulative().iter().position(|c| *c >= 0.0)
    }

    pub fn cumulative(&self) -> Vec<f64> {
        self.flows
            .iter()
            .scan(0.0, |acc, flow| {
                *acc += flow;
                Some(*acc)
            })
            .collect()
    }

    /// Present value of positive flows over the upfront outlay
    pub fn profitability_index(&self, rate: f64) -> f64 {
        let upfront = self.flows.first().map(|f| f.abs()).unwrap_or(0.0);
        if upfront == 0.0 {
            return 0.0;
        }
        let positive_pv: f64 = self
            .flows
            .iter()
            .enumerate()
            .filter(|(_, flow)| **flow > 0.0)
            .map(|(t, flow)| flow / (1.0 + rate).powi(t as i32))
            .sum();
        positive_pv / upfront
    }
}

fn bisect(f: impl Fn(f64) -> f64, mut low: f64, mut high: f64) -> f64 {
    let mut low_value = f(low);
    for _ in 0..BISECTION_ITERATIONS {
        let mid = 0.5 * (low + high);
        let mid_value = f(mid);
        if mid_value == 0.0 || (high - low) < f64::EPSILON {
            return mid;
        }
        if mid_value.signum() == low_value.signum() {
            low = mid;
            low_value = mid_value;
        } else {
            high = mid;
        }
    }
    0.5 * (low + high)
}

/// `max(floor(days / 30), 1)`
pub fn duration_months(duration_days: u32) -> usize {
    (duration_days / DAYS_PER_PERIOD).max(1) as usize
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialEvaluation {
    pub production_kg: f64,
    pub price: f64,
    pub revenue: f64,
    pub total_cost: f64,
    pub gross_profit: f64,
    pub margin_pct: f64,
    pub roi_pct: f64,
    pub npv: f64,
    pub irr_monthly: Option<f64>,
    pub irr_annual: Option<f64>,
    pub break_even_kg: f64,
    pub break_even_kg_ha: f64,
    pub break_even_revenue: f64,
    pub payback_period: Option<usize>,
    pub profitability_index: f64,
    /// Annual rate
    pub discount_rate: f64,
    pub schedule: CashFlowSchedule,
    /// NPV > 0 and gross profit > 0
    pub viable: bool,
}

/// Profit under a single ± variation of revenue and/or cost
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitSensitivityRow {
    pub variation_pct: f64,
    pub revenue_varied: f64,
    pub cost_varied: f64,
    pub optimistic: f64,
    pub pessimistic: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableCostBreakEven {
    pub units: f64,
    pub revenue: f64,
    pub contribution_margin: f64,
    pub contribution_margin_pct: f64,
}

/// Balance-sheet ratios of the producer, in percent
///
/// A ratio whose denominator is not positive is reported as 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FinancialRatios {
    pub equity: f64,
    pub debt_ratio_pct: f64,
    pub autonomy_ratio_pct: f64,
    pub roa_pct: f64,
    pub roe_pct: f64,
    pub net_margin_pct: f64,
}

pub const DEFAULT_PROFIT_VARIATIONS: [f64; 7] = [-30.0, -20.0, -10.0, 0.0, 10.0, 20.0, 30.0];

#[derive(Debug, Clone, Copy, Default)]
pub struct FinancialEvaluator;

impl FinancialEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(
        &self,
        prediction: &YieldPrediction,
        area_ha: f64,
        price: f64,
        total_cost: f64,
        duration_days: u32,
        annual_rate: f64,
    ) -> AnalysisResult<FinancialEvaluation> {
        ensure_positive(Stage::Financial, "price", price)?;
        ensure_positive(Stage::Financial, "area", area_ha)?;
        ensure_non_negative(Stage::Financial, "total cost", total_cost)?;
        ensure_non_negative(Stage::Financial, "discount rate", annual_rate)?;

        let production_kg = prediction.likely_kg_ha * area_ha;
        let revenue = production_kg * price;
        let gross_profit = revenue - total_cost;
        let margin_pct = if revenue > 0.0 { gross_profit / revenue * 100.0 } else { 0.0 };
        let roi_pct = if total_cost > 0.0 { gross_profit / total_cost * 100.0 } else { 0.0 };

        let break_even_kg = total_cost / price;
        let break_even_kg_ha = break_even_kg / area_ha;
        let break_even_revenue = break_even_kg * price;

        let monthly_rate = annual_rate / 12.0;
        let schedule = CashFlowSchedule::build(total_cost, revenue, duration_days);
        let npv = schedule.npv(monthly_rate);

        let irr_monthly = schedule.irr_monthly();
        if irr_monthly.is_none() {
            tracing::warn!(revenue, total_cost, "no internal rate of return for cash-flow schedule");
        }
        let irr_annual = irr_monthly.map(|r| (1.0 + r).powi(12) - 1.0);

        let evaluation = FinancialEvaluation {
            production_kg,
            price,
            revenue,
            total_cost,
            gross_profit,
            margin_pct,
            roi_pct,
            npv,
            irr_monthly,
            irr_annual,
            break_even_kg,
            break_even_kg_ha,
            break_even_revenue,
            payback_period: schedule.payback_period(),
            profitability_index: schedule.profitability_index(monthly_rate),
            discount_rate: annual_rate,
            viable: npv > 0.0 && gross_profit > 0.0,
            schedule,
        };

        tracing::debug!(npv, roi_pct, viable = evaluation.viable, "financial evaluation complete");
        Ok(evaluation)
    }

    /// Profit when revenue and cost move by each percentage in `variations`
    pub fn profit_sensitivity(
        &self,
        revenue: f64,
        total_cost: f64,
        variations: &[f64],
    ) -> AnalysisResult<Vec<ProfitSensitivityRow>> {
        variations
            .iter()
            .map(|&variation| {
                let factor = 1.0 + variation / 100.0;
                if factor <= 0.0 {
                    return Err(AnalysisError::invalid(
                        Stage::Financial,
                        "variation",
                        format!("{}% leaves nothing to divide by", variation),
                    ));
                }
                Ok(ProfitSensitivityRow {
                    variation_pct: variation,
                    revenue_varied: revenue * factor - total_cost,
                    cost_varied: revenue - total_cost * factor,
                    optimistic: revenue * factor - total_cost / factor,
                    pessimistic: revenue / factor - total_cost * factor,
                })
            })
            .collect()
    }

    /// Classic break-even with fixed and per-unit variable costs
    pub fn break_even_with_variable_costs(
        &self,
        fixed_costs: f64,
        unit_variable_cost: f64,
        unit_price: f64,
    ) -> AnalysisResult<VariableCostBreakEven> {
        ensure_non_negative(Stage::Financial, "fixed costs", fixed_costs)?;
        if unit_price <= unit_variable_cost {
            return Err(AnalysisError::invalid(
                Stage::Financial,
                "price",
                "must exceed the unit variable cost",
            ));
        }

        let contribution_margin = unit_price - unit_variable_cost;
        let units = fixed_costs / contribution_margin;
        Ok(VariableCostBreakEven {
            units,
            revenue: units * unit_price,
            contribution_margin,
            contribution_margin_pct: contribution_margin / unit_price * 100.0,
        })
    }

    /// Debt, autonomy, ROA, ROE and net margin from totals
    pub fn financial_ratios(&self, assets: f64, liabilities: f64, net_income: f64, revenue: f64) -> FinancialRatios {
        let equity = assets - liabilities;
        FinancialRatios {
            equity,
            debt_ratio_pct: percent_of(liabilities, assets),
            autonomy_ratio_pct: percent_of(equity, assets),
            roa_pct: percent_of(net_income, assets),
            roe_pct: percent_of(net_income, equity),
            net_margin_pct: percent_of(net_income, revenue),
        }
    }
}

fn percent_of(value: f64, base: f64) -> f64 {
    if base > 0.0 {
        value / base * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ReferenceData;
    use crate::inputs::AgronomicInputs;
    use crate::models::yield_predictor::YieldPredictor;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    fn prediction(area: f64) -> YieldPrediction {
        YieldPredictor::new(Arc::new(ReferenceData::builtin()))
            .predict("Maize", "Lima", area, &AgronomicInputs::default())
            .unwrap()
    }

    #[test]
    fn test_break_even_example() {
        let evaluation = FinancialEvaluator::new()
            .evaluate(&prediction(5.0), 5.0, 2.5, 13_300.0, 150, 0.12)
            .unwrap();
        assert_relative_eq!(evaluation.break_even_kg, 5320.0, epsilon = 1e-9);
        assert_relative_eq!(evaluation.break_even_kg_ha, 1064.0, epsilon = 1e-9);
        assert_relative_eq!(evaluation.break_even_revenue, 13_300.0, epsilon = 1e-9);
    }

    #[test]
    fn test_profit_ratios() {
        let p = prediction(5.0);
        let evaluation = FinancialEvaluator::new().evaluate(&p, 5.0, 2.5, 13_300.0, 150, 0.12).unwrap();
        let revenue = p.likely_kg_ha * 5.0 * 2.5;
        assert_relative_eq!(evaluation.revenue, revenue, epsilon = 1e-9);
        assert_relative_eq!(evaluation.gross_profit, revenue - 13_300.0, epsilon = 1e-9);
        assert_relative_eq!(evaluation.margin_pct, (revenue - 13_300.0) / revenue * 100.0, epsilon = 1e-9);
        assert_relative_eq!(evaluation.roi_pct, (revenue - 13_300.0) / 13_300.0 * 100.0, epsilon = 1e-9);
        assert!(evaluation.viable);
    }

    #[test]
    fn test_schedule_shape() {
        // 150 days → 5 periods + upfront
        let schedule = CashFlowSchedule::build(10_000.0, 50_000.0, 150);
        assert_eq!(schedule.len(), 6);
        assert_relative_eq!(schedule.flows()[0], -3000.0);
        for flow in &schedule.flows()[1..5] {
            assert_relative_eq!(*flow, -1750.0);
        }
        assert_relative_eq!(schedule.flows()[5], 50_000.0 - 1750.0);
    }

    #[test]
    fn test_single_month_schedule() {
        for days in [0, 10, 29, 59] {
            let schedule = CashFlowSchedule::build(10_000.0, 20_000.0, days);
            assert_eq!(schedule.flows(), &[-3000.0, 20_000.0]);
        }
        assert_eq!(duration_months(59), 1);
        assert_eq!(duration_months(60), 2);
    }

    #[test]
    fn test_npv_discounts_from_period_zero() {
        let schedule = CashFlowSchedule::new(vec![-100.0, 110.0]);
        assert_relative_eq!(schedule.npv(0.1), 0.0, epsilon = 1e-12);
        assert_relative_eq!(schedule.npv(0.0), 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_irr_zeroes_npv() {
        let schedules = [
            CashFlowSchedule::build(13_300.0, 61_275.0, 150),
            CashFlowSchedule::build(13_300.0, 14_000.0, 365),
            CashFlowSchedule::build(5_000.0, 100_000.0, 30),
            CashFlowSchedule::new(vec![-1000.0, 300.0, 400.0, 500.0]),
        ];
        for schedule in &schedules {
            let irr = schedule.irr_monthly().expect("schedule has a sign change");
            assert!(schedule.npv(irr).abs() < 1e-6, "npv at irr = {}", schedule.npv(irr));
        }
    }

    #[test]
    fn test_irr_without_sign_change() {
        assert_eq!(CashFlowSchedule::new(vec![-100.0, -50.0]).irr_monthly(), None);
        assert_eq!(CashFlowSchedule::new(vec![100.0, 50.0]).irr_monthly(), None);
    }

    #[test]
    fn test_bisection_finds_root() {
        let schedule = CashFlowSchedule::new(vec![-1000.0, 300.0, 400.0, 500.0]);
        let root = schedule.irr_bisection().unwrap();
        assert!(schedule.npv(root).abs() < 1e-6);
        assert_relative_eq!(root, schedule.irr_newton().unwrap(), epsilon = 1e-9);
    }

    #[test]
    fn test_payback_and_cumulative() {
        let schedule = CashFlowSchedule::new(vec![-100.0, -50.0, 200.0]);
        assert_eq!(schedule.cumulative(), vec![-100.0, -150.0, 50.0]);
        assert_eq!(schedule.payback_period(), Some(2));

        let never = CashFlowSchedule::new(vec![-100.0, -50.0, 100.0]);
        assert_eq!(never.payback_period(), None);
    }

    #[test]
    fn test_profitability_index() {
        let schedule = CashFlowSchedule::new(vec![-100.0, 110.0]);
        assert_relative_eq!(schedule.profitability_index(0.1), 1.0, epsilon = 1e-12);
        assert_eq!(CashFlowSchedule::new(vec![0.0, 10.0]).profitability_index(0.1), 0.0);
    }

    #[test]
    fn test_viability_requires_positive_npv_and_profit() {
        let p = prediction(1.0);
        let evaluator = FinancialEvaluator::new();
        // Revenue below cost
        let losing = evaluator.evaluate(&p, 1.0, 0.5, 100_000.0, 150, 0.12).unwrap();
        assert!(!losing.viable);
        assert!(losing.npv < 0.0);
    }

    #[test]
    fn test_invalid_price_and_area() {
        let p = prediction(1.0);
        let evaluator = FinancialEvaluator::new();
        assert!(matches!(
            evaluator.evaluate(&p, 1.0, 0.0, 100.0, 150, 0.12),
            Err(AnalysisError::InvalidInput { field: "price", .. })
        ));
        assert!(matches!(
            evaluator.evaluate(&p, 0.0, 1.0, 100.0, 150, 0.12),
            Err(AnalysisError::InvalidInput { field: "area", .. })
        ));
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let p = prediction(3.0);
        let evaluator = FinancialEvaluator::new();
        let a = evaluator.evaluate(&p, 3.0, 1.2, 9000.0, 120, 0.12).unwrap();
        let b = evaluator.evaluate(&p, 3.0, 1.2, 9000.0, 120, 0.12).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_profit_sensitivity() {
        let rows = FinancialEvaluator::new()
            .profit_sensitivity(10_000.0, 8_000.0, &DEFAULT_PROFIT_VARIATIONS)
            .unwrap();
        assert_eq!(rows.len(), 7);
        let base = &rows[3];
        assert_relative_eq!(base.revenue_varied, 2000.0);
        assert_relative_eq!(base.optimistic, 2000.0);

        let up = &rows[5];
        assert_relative_eq!(up.revenue_varied, 12_000.0 - 8_000.0, epsilon = 1e-9);
        assert_relative_eq!(up.cost_varied, 10_000.0 - 9_600.0, epsilon = 1e-9);
        assert_relative_eq!(up.optimistic, 12_000.0 - 8_000.0 / 1.2, epsilon = 1e-9);
        assert_relative_eq!(up.pessimistic, 10_000.0 / 1.2 - 9_600.0, epsilon = 1e-9);

        assert!(FinancialEvaluator::new()
            .profit_sensitivity(10_000.0, 8_000.0, &[-100.0])
            .is_err());
    }

    #[test]
    fn test_annual_irr_compounds_monthly() {
        let p = prediction(5.0);
        let evaluation = FinancialEvaluator::new()
            .evaluate(&p, 5.0, 2.5, 13_300.0, 150, 0.12)
            .unwrap();
        let monthly = evaluation.irr_monthly.unwrap();
        let annual = evaluation.irr_annual.unwrap();
        assert_relative_eq!(annual, (1.0 + monthly).powi(12) - 1.0, epsilon = 1e-12);
        assert!(annual > monthly);
        assert_relative_eq!(evaluation.schedule.npv(monthly), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_financial_ratios() {
        let ratios = FinancialEvaluator::new().financial_ratios(100_000.0, 40_000.0, 12_000.0, 80_000.0);
        assert_relative_eq!(ratios.equity, 60_000.0);
        assert_relative_eq!(ratios.debt_ratio_pct, 40.0, epsilon = 1e-12);
        assert_relative_eq!(ratios.autonomy_ratio_pct, 60.0, epsilon = 1e-12);
        assert_relative_eq!(ratios.roa_pct, 12.0, epsilon = 1e-12);
        assert_relative_eq!(ratios.roe_pct, 20.0, epsilon = 1e-12);
        assert_relative_eq!(ratios.net_margin_pct, 15.0, epsilon = 1e-12);
    }

    #[test]
    fn test_financial_ratios_without_assets_or_equity() {
        let evaluator = FinancialEvaluator::new();

        let no_assets = evaluator.financial_ratios(0.0, 5_000.0, 1_000.0, 10_000.0);
        assert_eq!(no_assets.equity, -5_000.0);
        assert_eq!(no_assets.debt_ratio_pct, 0.0);
        assert_eq!(no_assets.autonomy_ratio_pct, 0.0);
        assert_eq!(no_assets.roa_pct, 0.0);
        assert_eq!(no_assets.roe_pct, 0.0);
        assert_relative_eq!(no_assets.net_margin_pct, 10.0, epsilon = 1e-12);

        // Liabilities equal to assets leave no equity
        let no_equity = evaluator.financial_ratios(50_000.0, 50_000.0, 2_000.0, 0.0);
        assert_eq!(no_equity.equity, 0.0);
        assert_relative_eq!(no_equity.debt_ratio_pct, 100.0, epsilon = 1e-12);
        assert_eq!(no_equity.roe_pct, 0.0);
        assert_eq!(no_equity.net_margin_pct, 0.0);
        assert_relative_eq!(no_equity.roa_pct, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_break_even_with_variable_costs() {
        let evaluator = FinancialEvaluator::new();
        let result = evaluator.break_even_with_variable_costs(6000.0, 1.0, 2.5).unwrap();
        assert_relative_eq!(result.units, 4000.0);
        assert_relative_eq!(result.revenue, 10_000.0);
        assert_relative_eq!(result.contribution_margin, 1.5);
        assert_relative_eq!(result.contribution_margin_pct, 60.0);

        assert!(evaluator.break_even_with_variable_costs(6000.0, 3.0, 2.5).is_err());
    }
}
