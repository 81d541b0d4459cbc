//! Yield Predictor
//!
//! Scales a crop's baseline yield range by a regional factor and a weighted
//! agronomic adjustment factor built from soil fertility, water availability,
//! technology level and producer experience.
//!
//! Factor:
//!   f = 0.30·soil/10 + 0.30·water/10 + 0.25·tech/10 + 0.15·min(exp/20, 1)
//!
//! Range:
//!   min    = base_min  · r · max(f − 0.2, 0.5)
//!   likely = base_mean · r · f
//!   max    = base_max  · r · min(f + 0.2, 1.2)
//!
//! Sowing outside the crop's optimal months costs 8% of `likely` and `max`.

use crate::data::{ReferenceData, DEFAULT_REGION_FACTOR};
use crate::error::{ensure_month, ensure_non_negative, ensure_positive, AnalysisError, AnalysisResult, Stage};
use crate::inputs::{AgronomicInputs, ProjectInputs};
use serde::Serialize;
use std::sync::Arc;

pub const SOIL_WEIGHT: f64 = 0.30;
pub const WATER_WEIGHT: f64 = 0.30;
pub const TECHNOLOGY_WEIGHT: f64 = 0.25;
pub const EXPERIENCE_WEIGHT: f64 = 0.15;

/// Years of experience after which the experience term saturates
pub const EXPERIENCE_SATURATION_YEARS: f64 = 20.0;

/// Multiplier on likely/max yield when sowing outside the optimal months
pub const OFF_SEASON_FACTOR: f64 = 0.92;

/// Informational confidence label (not used in scoring)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Discretize the mean of soil, water and technology scores
    pub fn from_scores(soil: f64, water: f64, technology: f64) -> Self {
        let average = (soil + water + technology) / 3.0;
        if average >= 8.0 {
            Confidence::High
        } else if average >= 6.0 {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    pub fn display_text(&self) -> &'static str {
        match self {
            Confidence::High => "High",
            Confidence::Medium => "Medium",
            Confidence::Low => "Low",
        }
    }
}

/// Predicted yield range for one campaign
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YieldPrediction {
    pub crop: String,
    pub region: String,
    pub area_ha: f64,
    /// kg/ha
    pub min_kg_ha: f64,
    pub likely_kg_ha: f64,
    pub max_kg_ha: f64,
    /// Per-hectare figures × area (kg)
    pub production_min_kg: f64,
    pub production_likely_kg: f64,
    pub production_max_kg: f64,
    pub adjustment_factor: f64,
    pub region_factor: f64,
    /// False when the region fell back to the default factor
    pub region_known: bool,
    pub sowing_month: Option<u32>,
    /// None when no sowing month was supplied
    pub optimal_month: Option<bool>,
    pub seasonal_factor: f64,
    pub confidence: Confidence,
    pub advisories: Vec<String>,
}

impl YieldPrediction {
    /// Same prediction with every yield figure multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        let mut scaled = self.clone();
        scaled.min_kg_ha *= factor;
        scaled.likely_kg_ha *= factor;
        scaled.max_kg_ha *= factor;
        scaled.production_min_kg = scaled.min_kg_ha * scaled.area_ha;
        scaled.production_likely_kg = scaled.likely_kg_ha * scaled.area_ha;
        scaled.production_max_kg = scaled.max_kg_ha * scaled.area_ha;
        scaled
    }
}

/// Gap between an observed yield and the crop's potential
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YieldGap {
    pub actual_kg_ha: f64,
    pub target_kg_ha: f64,
    pub absolute_gap: f64,
    /// Percent of target
    pub relative_gap_pct: f64,
    pub category: YieldCategory,
    pub improvement_potential: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum YieldCategory {
    Excellent,
    Good,
    Fair,
    Low,
}

/// Weighted agronomic adjustment factor
pub fn adjustment_factor(agronomic: &AgronomicInputs) -> f64 {
    let experience = (agronomic.experience_years / EXPERIENCE_SATURATION_YEARS).min(1.0);

    SOIL_WEIGHT * (agronomic.soil_fertility / 10.0)
        + WATER_WEIGHT * (agronomic.water_availability / 10.0)
        + TECHNOLOGY_WEIGHT * (agronomic.technology / 10.0)
        + EXPERIENCE_WEIGHT * experience
}

pub struct YieldPredictor {
    reference: Arc<ReferenceData>,
}

impl YieldPredictor {
    pub fn new(reference: Arc<ReferenceData>) -> Self {
        Self { reference }
    }

    /// Predict without a sowing month (no seasonal adjustment)
    pub fn predict(
        &self,
        crop: &str,
        region: &str,
        area_ha: f64,
        agronomic: &AgronomicInputs,
    ) -> AnalysisResult<YieldPrediction> {
        self.predict_with_season(crop, region, area_ha, agronomic, None)
    }

    /// Predict using the campaign's effective sowing month
    pub fn predict_for(&self, inputs: &ProjectInputs) -> AnalysisResult<YieldPrediction> {
        self.predict_with_season(
            inputs.crop(),
            inputs.region(),
            inputs.area_ha(),
            inputs.agronomic(),
            Some(inputs.sowing_month()),
        )
    }

    pub fn predict_with_season(
        &self,
        crop: &str,
        region: &str,
        area_ha: f64,
        agronomic: &AgronomicInputs,
        sowing_month: Option<u32>,
    ) -> AnalysisResult<YieldPrediction> {
        ensure_positive(Stage::Yield, "area", area_ha)?;
        agronomic.validate(Stage::Yield)?;
        if let Some(month) = sowing_month {
            ensure_month(Stage::Yield, "sowing month", month)?;
        }

        let crop_info = self
            .reference
            .crop(crop)
            .ok_or_else(|| AnalysisError::crop_not_found(crop))?;

        let region_info = self.reference.region(region);
        let region_factor = match region_info {
            Some(info) => info.adjustment_factor,
            None => {
                tracing::warn!(region, "unknown region, using default adjustment factor {}", DEFAULT_REGION_FACTOR);
                DEFAULT_REGION_FACTOR
            }
        };

        let f = adjustment_factor(agronomic);

        let mut min = crop_info.yield_min_kg_ha * region_factor * (f - 0.2).max(0.5);
        let mut likely = crop_info.yield_mean_kg_ha * region_factor * f;
        let mut max = crop_info.yield_max_kg_ha * region_factor * (f + 0.2).min(1.2);

        // Seasonal penalty is applied after the base range, never folded into f
        let optimal_month = sowing_month.map(|m| crop_info.is_optimal_month(m));
        let seasonal_factor = match optimal_month {
            Some(false) => OFF_SEASON_FACTOR,
            _ => 1.0,
        };
        likely *= seasonal_factor;
        max *= seasonal_factor;

        // Very low factors can push the 0.5 floor on min above likely
        if min > likely {
            min = likely;
        }

        let confidence = Confidence::from_scores(
            agronomic.soil_fertility,
            agronomic.water_availability,
            agronomic.technology,
        );

        let mut advisories = Vec::new();
        if likely < crop_info.yield_mean_kg_ha * 0.8 {
            advisories.push(
                "Estimated yield is below the crop average. Consider improving soil fertility and the irrigation system."
                    .to_string(),
            );
        }
        if let Some(advice) = crop_advisory(&crop_info.name) {
            advisories.push(advice.to_string());
        }
        if let Some(info) = region_info {
            if info.has_limited_water() {
                advisories.push(format!(
                    "In {}, consider efficient irrigation (drip or sprinkler) due to limited water availability.",
                    info.name
                ));
            }
        }

        tracing::debug!(
            crop = %crop_info.name,
            adjustment_factor = f,
            region_factor,
            likely,
            "yield predicted"
        );

        Ok(YieldPrediction {
            crop: crop_info.name.clone(),
            region: region.to_string(),
            area_ha,
            min_kg_ha: min,
            likely_kg_ha: likely,
            max_kg_ha: max,
            production_min_kg: min * area_ha,
            production_likely_kg: likely * area_ha,
            production_max_kg: max * area_ha,
            adjustment_factor: f,
            region_factor,
            region_known: region_info.is_some(),
            sowing_month,
            optimal_month,
            seasonal_factor,
            confidence,
            advisories,
        })
    }

    /// Compare observed yield against a target (default: crop mean)
    pub fn yield_gap(&self, crop: &str, actual_kg_ha: f64, target_kg_ha: Option<f64>) -> AnalysisResult<YieldGap> {
        ensure_non_negative(Stage::Yield, "actual yield", actual_kg_ha)?;
        let crop_info = self
            .reference
            .crop(crop)
            .ok_or_else(|| AnalysisError::crop_not_found(crop))?;

        let target = target_kg_ha.unwrap_or(crop_info.yield_mean_kg_ha);
        let absolute_gap = target - actual_kg_ha;
        let relative_gap_pct = if target > 0.0 { absolute_gap / target * 100.0 } else { 0.0 };

        let category = if actual_kg_ha >= crop_info.yield_max_kg_ha {
            YieldCategory::Excellent
        } else if actual_kg_ha >= crop_info.yield_mean_kg_ha {
            YieldCategory::Good
        } else if actual_kg_ha >= crop_info.yield_min_kg_ha {
            YieldCategory::Fair
        } else {
            YieldCategory::Low
        };

        Ok(YieldGap {
            actual_kg_ha,
            target_kg_ha: target,
            absolute_gap,
            relative_gap_pct,
            category,
            improvement_potential: absolute_gap.max(0.0),
        })
    }

    /// Predictions for several crops under the same conditions; unknown crops are skipped
    pub fn compare_crops(
        &self,
        crops: &[&str],
        region: &str,
        area_ha: f64,
        agronomic: &AgronomicInputs,
    ) -> AnalysisResult<Vec<YieldPrediction>> {
        let mut predictions = Vec::with_capacity(crops.len());
        for crop in crops {
            match self.predict(crop, region, area_ha, agronomic) {
                Ok(prediction) => predictions.push(prediction),
                Err(AnalysisError::NotFound { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(predictions)
    }
}

fn crop_advisory(crop: &str) -> Option<&'static str> {
    match crop {
        "Potato" => Some(
            "Potato needs strict pest control (especially late blight). Run a preventive programme.",
        ),
        "Coffee" => Some(
            "Coffee needs partial shade and berry borer control. Consider shade trees and integrated pest management.",
        ),
        "Rice" => Some(
            "Rice needs careful water management. Keep constant flood irrigation during the vegetative phase.",
        ),
        _ => None,
    }
}
