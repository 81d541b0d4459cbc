//! Scoring Engine
//!
//! Four independent criteria add up to a 0-100 campaign score:
//!
//! | Criterion          | Max | Driven by                                  |
//! |--------------------|-----|--------------------------------------------|
//! | Profitability      | 40  | NPV sign, ROI tier, margin tier            |
//! | Risk               | 30  | IRA tier                                   |
//! | Scenario stability | 20  | Pessimistic NPV, optimistic/pessimistic gap|
//! | Market             | 10  | Break-even coverage, price volatility      |
//!
//! The total maps to one of four recommendations.

use crate::error::{AnalysisError, AnalysisResult, Stage};
use crate::models::financial::FinancialEvaluation;
use crate::models::risk::RiskAssessment;
use crate::models::scenario::{ScenarioResults, BASE, OPTIMISTIC, PESSIMISTIC};
use crate::utils::thresholds::RiskCategory;
use serde::Serialize;

pub const MAX_PROFITABILITY: u32 = 40;
pub const MAX_RISK: u32 = 30;
pub const MAX_SCENARIO: u32 = 20;
pub const MAX_MARKET: u32 = 10;

/// Absolute pessimistic-NPV floor for partial stability points (currency units)
pub const PESSIMISTIC_NPV_FLOOR: f64 = -1000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum RecommendationCategory {
    DoNotPlant,
    RotateOrAdjust,
    ProceedWithCaution,
    Proceed,
}

impl RecommendationCategory {
    pub fn from_score(total: u32) -> Self {
        match total {
            t if t >= 80 => RecommendationCategory::Proceed,
            t if t >= 60 => RecommendationCategory::ProceedWithCaution,
            t if t >= 40 => RecommendationCategory::RotateOrAdjust,
            _ => RecommendationCategory::DoNotPlant,
        }
    }

    pub fn headline(&self) -> &'static str {
        match self {
            RecommendationCategory::Proceed => "Plant this crop",
            RecommendationCategory::ProceedWithCaution => "Plant this crop with precautions",
            RecommendationCategory::RotateOrAdjust => "Rotate or adjust the crop",
            RecommendationCategory::DoNotPlant => "Do not plant this campaign",
        }
    }

    pub fn rationale(&self) -> &'static str {
        match self {
            RecommendationCategory::Proceed => {
                "Highly recommended. Profitability indicators are excellent, risks are controlled, \
                 results hold across scenarios and market conditions are favourable. Proceed \
                 following the identified agronomic best practices."
            }
            RecommendationCategory::ProceedWithCaution => {
                "Viable with caveats. Mitigate the identified risks, watch market conditions \
                 closely, consider crop insurance and optimize production costs before proceeding."
            }
            RecommendationCategory::RotateOrAdjust => {
                "Significant risks. Evaluate more profitable crops for the region, reduce \
                 production costs, improve technology and practices, and look for markets with \
                 better prices before proceeding."
            }
            RecommendationCategory::DoNotPlant => {
                "Not recommended. Profitability is insufficient or negative, risks cannot be \
                 mitigated in the short term and the campaign is highly vulnerable to change. \
                 Evaluate different alternatives or wait for a better campaign."
            }
        }
    }

    pub fn actions(&self) -> [&'static str; 3] {
        match self {
            RecommendationCategory::Proceed => [
                "Start land preparation according to schedule",
                "Secure quality inputs",
                "Set up a phytosanitary monitoring calendar",
            ],
            RecommendationCategory::ProceedWithCaution => [
                "Buy agricultural insurance before starting",
                "Install an efficient irrigation system",
                "Prepare a contingency plan for the identified risks",
            ],
            RecommendationCategory::RotateOrAdjust => [
                "Re-evaluate alternative crops for the region",
                "Seek specialized technical advice",
                "Run a deeper market analysis",
            ],
            RecommendationCategory::DoNotPlant => [
                "Suspend the project temporarily",
                "Evaluate completely different crops",
                "Consider partnering with experienced producers",
            ],
        }
    }
}

/// How balanced the four criteria are, as a proxy for recommendation confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConfidenceLevel {
    VeryHigh,
    High,
    Medium,
    /// Criteria are unbalanced
    Low,
}

impl ConfidenceLevel {
    /// From the spread between the best and worst criterion percentages
    pub fn from_spread(spread_pct: f64) -> Self {
        if spread_pct < 20.0 {
            ConfidenceLevel::VeryHigh
        } else if spread_pct < 40.0 {
            ConfidenceLevel::High
        } else if spread_pct < 60.0 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionDetails {
    pub profitability: &'static str,
    pub risk: &'static str,
    pub scenarios: &'static str,
    pub market: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub profitability: u32,
    pub risk: u32,
    pub scenario_stability: u32,
    pub market: u32,
    pub total: u32,
    pub recommendation: RecommendationCategory,
    pub rationale: &'static str,
    pub actions: Vec<String>,
    pub details: CriterionDetails,
    pub confidence: ConfidenceLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QuickRecommendation {
    Recommended,
    ViableWithCaution,
    NotRecommended,
}

/// NPV sign, ROI tier and margin tier (max 40)
pub fn profitability_points(npv: f64, roi_pct: f64, margin_pct: f64) -> u32 {
    let npv_points = if npv > 0.0 { 15 } else { 0 };

    let roi_points = match roi_pct {
        r if r > 50.0 => 15,
        r if r > 30.0 => 12,
        r if r > 20.0 => 10,
        r if r > 10.0 => 7,
        r if r > 0.0 => 5,
        _ => 0,
    };

    let margin_points = match margin_pct {
        m if m > 30.0 => 10,
        m if m > 20.0 => 8,
        m if m > 15.0 => 7,
        m if m > 10.0 => 5,
        m if m > 0.0 => 3,
        _ => 0,
    };

    (npv_points + roi_points + margin_points).min(MAX_PROFITABILITY)
}

/// Inverse IRA tiers (max 30)
pub fn risk_points(ira: f64) -> u32 {
    match ira {
        i if i < 0.33 => 30,
        i if i < 0.40 => 25,
        i if i < 0.50 => 22,
        i if i < 0.67 => 15,
        i if i < 0.80 => 8,
        _ => 0,
    }
}

/// Pessimistic NPV and spread across scenarios (max 20)
pub fn scenario_points(pessimistic_npv: f64, base_npv: f64, optimistic_npv: f64) -> u32 {
    let downside = if pessimistic_npv > 0.0 {
        10
    } else if pessimistic_npv > PESSIMISTIC_NPV_FLOOR {
        5
    } else {
        0
    };

    let spread = if base_npv != 0.0 {
        let variability = (optimistic_npv - pessimistic_npv).abs() / base_npv.abs();
        match variability {
            v if v < 1.0 => 10,
            v if v < 1.5 => 8,
            v if v < 2.0 => 6,
            _ => 2,
        }
    } else {
        0
    };

    (downside + spread).min(MAX_SCENARIO)
}

/// Break-even coverage and crop price volatility (max 10)
pub fn market_points(break_even_revenue: f64, revenue: f64, volatility: f64) -> u32 {
    let coverage = if revenue > 0.0 {
        match break_even_revenue / revenue {
            r if r < 0.5 => 5,
            r if r < 0.7 => 3,
            r if r < 0.9 => 1,
            _ => 0,
        }
    } else {
        0
    };

    let stability = match volatility {
        v if v < 0.20 => 5,
        v if v < 0.30 => 4,
        v if v < 0.40 => 2,
        _ => 1,
    };

    (coverage + stability).min(MAX_MARKET)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn score(
        &self,
        financial: &FinancialEvaluation,
        risk: &RiskAssessment,
        scenarios: &ScenarioResults,
    ) -> AnalysisResult<ScoreBreakdown> {
        let npv_of = |name: &'static str| {
            scenarios
                .get(name)
                .map(|s| s.evaluation.npv)
                .ok_or_else(|| AnalysisError::missing(Stage::Scoring, name))
        };
        let pessimistic_npv = npv_of(PESSIMISTIC)?;
        let base_npv = npv_of(BASE)?;
        let optimistic_npv = npv_of(OPTIMISTIC)?;

        let profitability = profitability_points(financial.npv, financial.roi_pct, financial.margin_pct);
        let risk_score = risk_points(risk.ira);
        let scenario_stability = scenario_points(pessimistic_npv, base_npv, optimistic_npv);
        let market = market_points(financial.break_even_revenue, financial.revenue, risk.market.volatility);

        let total = profitability + risk_score + scenario_stability + market;
        let recommendation = RecommendationCategory::from_score(total);

        let details = CriterionDetails {
            profitability: profitability_detail(financial.npv, financial.roi_pct, financial.margin_pct),
            risk: risk_detail(risk.category),
            scenarios: scenario_detail(pessimistic_npv),
            market: market_detail(risk.market.volatility),
        };

        let confidence = confidence_level(profitability, risk_score, scenario_stability, market);

        tracing::debug!(
            profitability,
            risk = risk_score,
            scenario_stability,
            market,
            total,
            "campaign scored"
        );

        Ok(ScoreBreakdown {
            profitability,
            risk: risk_score,
            scenario_stability,
            market,
            total,
            recommendation,
            rationale: recommendation.rationale(),
            actions: recommendation.actions().iter().map(|a| a.to_string()).collect(),
            details,
            confidence,
        })
    }
}

fn confidence_level(profitability: u32, risk: u32, scenarios: u32, market: u32) -> ConfidenceLevel {
    let percentages = [
        profitability as f64 / MAX_PROFITABILITY as f64 * 100.0,
        risk as f64 / MAX_RISK as f64 * 100.0,
        scenarios as f64 / MAX_SCENARIO as f64 * 100.0,
        market as f64 / MAX_MARKET as f64 * 100.0,
    ];
    let max = percentages.iter().cloned().fold(f64::MIN, f64::max);
    let min = percentages.iter().cloned().fold(f64::MAX, f64::min);
    ConfidenceLevel::from_spread(max - min)
}

fn profitability_detail(npv: f64, roi_pct: f64, margin_pct: f64) -> &'static str {
    if npv > 0.0 && roi_pct > 30.0 && margin_pct > 20.0 {
        "Excellent profitability on every indicator"
    } else if npv > 0.0 && roi_pct > 15.0 {
        "Satisfactory profitability"
    } else if npv > 0.0 {
        "Positive but tight profitability"
    } else {
        "Insufficient profitability"
    }
}

fn risk_detail(category: RiskCategory) -> &'static str {
    match category {
        RiskCategory::Low => "Low, manageable risk",
        RiskCategory::Medium => "Moderate risk, requires monitoring",
        RiskCategory::High => "High risk, mitigation measures required",
    }
}

fn scenario_detail(pessimistic_npv: f64) -> &'static str {
    if pessimistic_npv > 0.0 {
        "Viable even in the pessimistic scenario"
    } else if pessimistic_npv > -5000.0 {
        "Moderately vulnerable in the pessimistic scenario"
    } else {
        "Highly vulnerable under adverse conditions"
    }
}

fn market_detail(volatility: f64) -> &'static str {
    if volatility < 0.25 {
        "Stable market with low volatility"
    } else if volatility < 0.40 {
        "Moderate price volatility"
    } else {
        "High price volatility, consider hedging strategies"
    }
}

/// Shortcut recommendation from headline indicators alone
pub fn quick_recommendation(npv: f64, roi_pct: f64, ira: f64) -> QuickRecommendation {
    if npv > 0.0 && roi_pct > 20.0 && ira < 0.5 {
        QuickRecommendation::Recommended
    } else if npv > 0.0 && roi_pct > 10.0 {
        QuickRecommendation::ViableWithCaution
    } else {
        QuickRecommendation::NotRecommended
    }
}
