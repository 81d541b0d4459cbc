//! Risk Engine
//!
//! Composite Agro-Economic Risk Index (IRA) built from three sub-risks:
//!
//! - Climate (40%): drought, frost, flood and pest pressure for the region,
//!   raised by the region's seasonal multiplier in high-risk sowing months;
//!   unknown regions are assessed as Lima
//! - Market (35%): historical price volatility of the crop, raised 20% when
//!   the expected price deviates more than 30% from the historical mean
//! - Production (25%): spread of the predicted yield range
//!
//! Every sub-risk and the IRA share the same LOW/MEDIUM/HIGH cut points.

use crate::data::{ClimateProfile, ReferenceData, DEFAULT_AVG_TEMPERATURE, FALLBACK_CLIMATE_REGION};
use crate::error::{ensure_month, ensure_positive, AnalysisError, AnalysisResult, Stage};
use crate::models::monte_carlo::{self, MonteCarloSummary};
use crate::models::yield_predictor::YieldPrediction;
use crate::utils::thresholds::RiskCategory;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;

pub const CLIMATE_WEIGHT: f64 = 0.40;
pub const MARKET_WEIGHT: f64 = 0.35;
pub const PRODUCTION_WEIGHT: f64 = 0.25;

const DROUGHT_WEIGHT: f64 = 0.35;
const FROST_WEIGHT: f64 = 0.25;
const FLOOD_WEIGHT: f64 = 0.25;
const PEST_WEIGHT: f64 = 0.15;

/// Price deviation beyond which the expected price is considered unrealistic
const PRICE_DEVIATION_LIMIT: f64 = 0.3;
const PRICE_DEVIATION_PENALTY: f64 = 1.2;

/// Cap on the cumulative reduction from mitigation measures
const MAX_MITIGATION_REDUCTION: f64 = 0.35;
const MIN_PROJECTED_IRA: f64 = 0.1;

const MITIGATION_KEYWORDS: [(&str, f64); 6] = [
    ("insurance", 0.15),
    ("irrigation", 0.12),
    ("technology", 0.10),
    ("diversification", 0.08),
    ("training", 0.06),
    ("monitoring", 0.05),
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClimateComponents {
    pub drought: f64,
    pub frost: f64,
    pub flood: f64,
    pub pest: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClimateRisk {
    pub components: ClimateComponents,
    pub seasonal_factor: f64,
    pub total: f64,
    pub category: RiskCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketRisk {
    pub volatility: f64,
    pub adjusted_risk: f64,
    pub historical_price: Option<f64>,
    /// |expected − historical| / historical, 0 when either is unknown
    pub price_deviation: f64,
    pub category: RiskCategory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stability {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductionRisk {
    pub coefficient_of_variation: f64,
    pub risk: f64,
    pub margin_of_safety: f64,
    pub stability: Stability,
    pub category: RiskCategory,
}

/// Monitoring intensity implied by the IRA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttentionLevel {
    Routine,
    Moderate,
    Elevated,
    Critical,
}

impl AttentionLevel {
    pub fn from_ira(ira: f64) -> Self {
        if ira < 0.33 {
            AttentionLevel::Routine
        } else if ira < 0.5 {
            AttentionLevel::Moderate
        } else if ira < 0.67 {
            AttentionLevel::Elevated
        } else {
            AttentionLevel::Critical
        }
    }

    pub fn display_text(&self) -> &'static str {
        match self {
            AttentionLevel::Routine => "Routine monitoring",
            AttentionLevel::Moderate => "Moderate attention",
            AttentionLevel::Elevated => "Elevated attention",
            AttentionLevel::Critical => "Critical attention",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub region: String,
    pub crop: String,
    pub climate: ClimateRisk,
    pub market: MarketRisk,
    pub production: ProductionRisk,
    pub ira: f64,
    pub category: RiskCategory,
    pub recommendations: Vec<String>,
    pub attention_level: AttentionLevel,
    pub priority_actions: Vec<String>,
}

/// Effect of a set of mitigation measures on the IRA
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MitigationOutcome {
    pub current_ira: f64,
    pub projected_ira: f64,
    pub absolute_reduction: f64,
    /// Percent
    pub relative_reduction: f64,
    /// (measure, estimated reduction) for every measure that matched a keyword
    pub effective_measures: Vec<(String, f64)>,
    pub new_category: RiskCategory,
}

/// One row of the risk heat map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatMapCell {
    pub category: &'static str,
    pub factor: &'static str,
    pub level: f64,
}

pub struct RiskEngine {
    reference: Arc<ReferenceData>,
}

impl RiskEngine {
    pub fn new(reference: Arc<ReferenceData>) -> Self {
        Self { reference }
    }

    /// Full assessment for one campaign
    pub fn assess(
        &self,
        region: &str,
        crop: &str,
        prediction: &YieldPrediction,
        expected_price: Option<f64>,
        sowing_month: Option<u32>,
    ) -> AnalysisResult<RiskAssessment> {
        if let Some(price) = expected_price {
            ensure_positive(Stage::Risk, "expected price", price)?;
        }

        let climate = self.climate_risk(region, sowing_month)?;
        let market = self.market_risk(crop, expected_price)?;
        let production = production_risk(prediction.min_kg_ha, prediction.likely_kg_ha, prediction.max_kg_ha);

        let raw_ira =
            CLIMATE_WEIGHT * climate.total + MARKET_WEIGHT * market.adjusted_risk + PRODUCTION_WEIGHT * production.risk;
        let ira = raw_ira.clamp(0.0, 1.0);
        let category = RiskCategory::from_value(ira);

        let recommendations = recommendations(&climate, &market, &production, category);
        let priority_actions = priority_actions(&climate, &market, &production);

        tracing::debug!(
            region,
            crop,
            climate = climate.total,
            market = market.adjusted_risk,
            production = production.risk,
            ira,
            "risk assessed"
        );

        Ok(RiskAssessment {
            region: region.to_string(),
            crop: crop.to_string(),
            climate,
            market,
            production,
            ira,
            category,
            recommendations,
            attention_level: AttentionLevel::from_ira(ira),
            priority_actions,
        })
    }

    /// Climate sub-risk
    ///
    /// Unknown regions borrow the profile and high-risk months of
    /// `FALLBACK_CLIMATE_REGION`; the default profile applies only when that
    /// region is missing too.
    pub fn climate_risk(&self, region: &str, sowing_month: Option<u32>) -> AnalysisResult<ClimateRisk> {
        if let Some(month) = sowing_month {
            ensure_month(Stage::Risk, "sowing month", month)?;
        }

        let region_info = match self.reference.region(region) {
            Some(info) => Some(info),
            None => {
                tracing::warn!(
                    region,
                    fallback = FALLBACK_CLIMATE_REGION,
                    "unknown region, using fallback climate profile"
                );
                self.reference.region(FALLBACK_CLIMATE_REGION)
            }
        };
        let default_profile = ClimateProfile::default();
        let profile = region_info.map(|r| &r.climate).unwrap_or(&default_profile);

        let temperature = profile.avg_temperature.unwrap_or(DEFAULT_AVG_TEMPERATURE);
        let pest = (0.25 + 0.01 * (temperature - 15.0)).clamp(0.15, 0.45);

        let components = ClimateComponents {
            drought: profile.drought,
            frost: profile.frost,
            flood: profile.flood,
            pest,
        };

        let seasonal_factor = match (region_info, sowing_month) {
            (Some(info), Some(month)) => info.seasonal_factor(month),
            _ => 1.0,
        };

        let total = (DROUGHT_WEIGHT * components.drought
            + FROST_WEIGHT * components.frost
            + FLOOD_WEIGHT * components.flood
            + PEST_WEIGHT * components.pest)
            * seasonal_factor;

        Ok(ClimateRisk {
            components,
            seasonal_factor,
            total,
            category: RiskCategory::from_value(total),
        })
    }

    /// Market sub-risk from crop price volatility
    pub fn market_risk(&self, crop: &str, expected_price: Option<f64>) -> AnalysisResult<MarketRisk> {
        let crop_info = self
            .reference
            .crop(crop)
            .ok_or_else(|| AnalysisError::crop_not_found(crop))?;

        let volatility = crop_info.price_volatility;
        let historical_price = crop_info.historical_mean_price;

        let price_deviation = match (expected_price, historical_price) {
            (Some(expected), Some(historical)) if historical > 0.0 => (expected - historical).abs() / historical,
            _ => 0.0,
        };

        let adjusted_risk = if price_deviation > PRICE_DEVIATION_LIMIT {
            volatility * PRICE_DEVIATION_PENALTY
        } else {
            volatility
        };

        Ok(MarketRisk {
            volatility,
            adjusted_risk,
            historical_price,
            price_deviation,
            category: RiskCategory::from_value(adjusted_risk),
        })
    }

    /// Monte Carlo simulation of yield around `likely`
    pub fn simulate<R: Rng + ?Sized>(
        &self,
        likely_kg_ha: f64,
        volatility: f64,
        samples: usize,
        rng: &mut R,
    ) -> AnalysisResult<MonteCarloSummary> {
        monte_carlo::simulate_yield(likely_kg_ha, volatility, samples, rng)
    }

    /// Projected IRA after applying mitigation measures
    ///
    /// Each measure counts once, for the first keyword it mentions.
    pub fn evaluate_mitigation(&self, current_ira: f64, measures: &[&str]) -> MitigationOutcome {
        let mut reduction = 0.0;
        let mut effective_measures = Vec::new();

        for measure in measures {
            let lowered = measure.to_lowercase();
            if let Some((_, factor)) = MITIGATION_KEYWORDS.iter().find(|(key, _)| lowered.contains(key)) {
                reduction += factor;
                effective_measures.push((measure.to_string(), *factor));
            }
        }

        let reduction = reduction.min(MAX_MITIGATION_REDUCTION);
        let projected_ira = (current_ira * (1.0 - reduction)).max(MIN_PROJECTED_IRA);

        MitigationOutcome {
            current_ira,
            projected_ira,
            absolute_reduction: current_ira - projected_ira,
            relative_reduction: reduction * 100.0,
            effective_measures,
            new_category: RiskCategory::from_value(projected_ira),
        }
    }

    /// Same crop and yield range assessed across regions, lowest IRA first
    pub fn compare_regions(
        &self,
        crop: &str,
        regions: &[&str],
        prediction: &YieldPrediction,
    ) -> AnalysisResult<Vec<RiskAssessment>> {
        let mut assessments = regions
            .iter()
            .map(|region| self.assess(region, crop, prediction, None, None))
            .collect::<AnalysisResult<Vec<_>>>()?;

        assessments.sort_by(|a, b| a.ira.total_cmp(&b.ira));
        Ok(assessments)
    }
}

/// Production sub-risk from the predicted yield range
pub fn production_risk(min: f64, likely: f64, max: f64) -> ProductionRisk {
    let (cv, margin_of_safety) = if likely > 0.0 {
        ((max - min) / likely, (likely - min) / likely)
    } else {
        (0.0, 0.0)
    };
    let risk = (cv / 2.0).min(0.8);

    let stability = if cv < 0.3 {
        Stability::High
    } else if cv < 0.6 {
        Stability::Medium
    } else {
        Stability::Low
    };

    ProductionRisk {
        coefficient_of_variation: cv,
        risk,
        margin_of_safety,
        stability,
        category: RiskCategory::from_value(risk),
    }
}

/// Flat rows for rendering the risk components as a heat map
pub fn heat_map(assessment: &RiskAssessment) -> Vec<HeatMapCell> {
    let c = &assessment.climate.components;
    vec![
        HeatMapCell { category: "Climate", factor: "Drought", level: c.drought },
        HeatMapCell { category: "Climate", factor: "Frost", level: c.frost },
        HeatMapCell { category: "Climate", factor: "Flood", level: c.flood },
        HeatMapCell { category: "Climate", factor: "Pests", level: c.pest },
        HeatMapCell {
            category: "Market",
            factor: "Volatility",
            level: assessment.market.adjusted_risk,
        },
        HeatMapCell {
            category: "Production",
            factor: "Variability",
            level: assessment.production.risk,
        },
    ]
}

fn recommendations(
    climate: &ClimateRisk,
    market: &MarketRisk,
    production: &ProductionRisk,
    category: RiskCategory,
) -> Vec<String> {
    let mut out = Vec::new();
    let c = &climate.components;

    if c.drought > 0.4 {
        out.push("High drought probability: install efficient irrigation and consider drought-tolerant varieties");
    }
    if c.frost > 0.3 {
        out.push("Significant frost risk: consider frost protection or shift the sowing dates");
    }
    if c.flood > 0.4 {
        out.push("High risk of heavy rain: install adequate drainage and consider flood insurance");
    }
    if c.pest > 0.4 {
        out.push("High pest pressure expected: apply integrated pest management with constant monitoring");
    }
    if market.volatility > 0.35 {
        out.push("High price volatility: consider forward contracts or market diversification");
    }
    if market.price_deviation > 0.3 {
        out.push("Unrealistic price expectation: review market studies and adjust projections");
    }
    if production.risk > 0.5 {
        out.push("High yield variability: improve agronomic management and consider crop insurance");
    }
    if production.margin_of_safety < 0.3 {
        out.push("Low margin of safety: minimum yield is close to the expected yield. Improve cultivation practices");
    }

    out.push(match category {
        RiskCategory::High => "Overall risk is high: evaluate comprehensive mitigation before proceeding",
        RiskCategory::Medium => "Moderate risk: prepare a contingency plan and monitor constantly",
        RiskCategory::Low => "Low risk: keep good agricultural practices and preventive monitoring",
    });

    out.into_iter().map(String::from).collect()
}

fn priority_actions(climate: &ClimateRisk, market: &MarketRisk, production: &ProductionRisk) -> Vec<String> {
    let mut actions = Vec::new();

    if climate.total > 0.5 {
        actions.push("Set up a climate monitoring system");
        actions.push("Buy agricultural insurance against climate events");
    }
    if market.adjusted_risk > 0.4 {
        actions.push("Diversify sales channels");
        actions.push("Evaluate forward contracts or pre-sales");
    }
    if production.risk > 0.5 {
        actions.push("Adopt a rigorous agronomic management plan");
        actions.push("Train staff in good agricultural practices");
    }

    actions.into_iter().map(String::from).collect()
}
