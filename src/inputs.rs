//! Campaign inputs supplied by the producer
//!
//! `ProjectInputs` is validated once at construction and immutable afterwards;
//! every stage reads it through accessors.

use crate::error::{
    ensure_in_range, ensure_month, ensure_non_negative, ensure_positive, AnalysisError, AnalysisResult, Stage,
};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Itemized campaign costs (currency)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub labor: f64,
    pub seed: f64,
    pub fertilizer: f64,
    pub water: f64,
    pub machinery: f64,
    pub other: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.labor + self.seed + self.fertilizer + self.water + self.machinery + self.other
    }

    fn validate(&self) -> AnalysisResult<()> {
        ensure_non_negative(Stage::Inputs, "labor cost", self.labor)?;
        ensure_non_negative(Stage::Inputs, "seed cost", self.seed)?;
        ensure_non_negative(Stage::Inputs, "fertilizer cost", self.fertilizer)?;
        ensure_non_negative(Stage::Inputs, "water cost", self.water)?;
        ensure_non_negative(Stage::Inputs, "machinery cost", self.machinery)?;
        ensure_non_negative(Stage::Inputs, "other cost", self.other)?;
        ensure_positive(Stage::Inputs, "total cost", self.total())
    }
}

/// Agronomic conditions of the plot and producer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgronomicInputs {
    /// 1-10
    pub soil_fertility: f64,
    /// 1-10
    pub water_availability: f64,
    /// 1-10
    pub technology: f64,
    pub experience_years: f64,
}

impl Default for AgronomicInputs {
    fn default() -> Self {
        Self {
            soil_fertility: 7.0,
            water_availability: 7.0,
            technology: 6.0,
            experience_years: 10.0,
        }
    }
}

impl AgronomicInputs {
    pub(crate) fn validate(&self, stage: Stage) -> AnalysisResult<()> {
        ensure_in_range(stage, "soil_fertility", self.soil_fertility, 1.0, 10.0)?;
        ensure_in_range(stage, "water_availability", self.water_availability, 1.0, 10.0)?;
        ensure_in_range(stage, "technology", self.technology, 1.0, 10.0)?;
        ensure_non_negative(stage, "experience_years", self.experience_years)
    }
}

/// Everything the pipeline needs to know about one campaign
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectInputs {
    crop: String,
    region: String,
    area_ha: f64,
    start_date: NaiveDate,
    end_date: NaiveDate,
    expected_price: f64,
    costs: CostBreakdown,
    agronomic: AgronomicInputs,
    sowing_month: Option<u32>,
}

impl ProjectInputs {
    pub fn builder(crop: &str, region: &str) -> ProjectInputsBuilder {
        ProjectInputsBuilder::new(crop, region)
    }

    pub fn crop(&self) -> &str {
        &self.crop
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn area_ha(&self) -> f64 {
        self.area_ha
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn expected_price(&self) -> f64 {
        self.expected_price
    }

    pub fn costs(&self) -> &CostBreakdown {
        &self.costs
    }

    pub fn agronomic(&self) -> &AgronomicInputs {
        &self.agronomic
    }

    pub fn total_cost(&self) -> f64 {
        self.costs.total()
    }

    /// Campaign length in days (end - start)
    pub fn duration_days(&self) -> u32 {
        (self.end_date - self.start_date).num_days().max(0) as u32
    }

    pub fn cost_per_hectare(&self) -> f64 {
        self.total_cost() / self.area_ha
    }

    pub fn cost_per_day(&self) -> f64 {
        match self.duration_days() {
            0 => 0.0,
            days => self.total_cost() / days as f64,
        }
    }

    /// Explicit sowing month, or the month of the start date
    pub fn sowing_month(&self) -> u32 {
        self.sowing_month.unwrap_or_else(|| self.start_date.month())
    }

    pub fn explicit_sowing_month(&self) -> Option<u32> {
        self.sowing_month
    }
}

/// Builder for `ProjectInputs`; `build` validates every field
#[derive(Debug, Clone)]
pub struct ProjectInputsBuilder {
    crop: String,
    region: String,
    area_ha: f64,
    dates: Option<(NaiveDate, NaiveDate)>,
    expected_price: f64,
    costs: CostBreakdown,
    agronomic: AgronomicInputs,
    sowing_month: Option<u32>,
}

impl ProjectInputsBuilder {
    fn new(crop: &str, region: &str) -> Self {
        Self {
            crop: crop.to_string(),
            region: region.to_string(),
            area_ha: 0.0,
            dates: None,
            expected_price: 0.0,
            costs: CostBreakdown::default(),
            agronomic: AgronomicInputs::default(),
            sowing_month: None,
        }
    }

    pub fn area_ha(mut self, area: f64) -> Self {
        self.area_ha = area;
        self
    }

    pub fn campaign(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.dates = Some((start, end));
        self
    }

    pub fn expected_price(mut self, price: f64) -> Self {
        self.expected_price = price;
        self
    }

    pub fn costs(mut self, costs: CostBreakdown) -> Self {
        self.costs = costs;
        self
    }

    pub fn agronomic(mut self, agronomic: AgronomicInputs) -> Self {
        self.agronomic = agronomic;
        self
    }

    pub fn sowing_month(mut self, month: u32) -> Self {
        self.sowing_month = Some(month);
        self
    }

    pub fn build(self) -> AnalysisResult<ProjectInputs> {
        if self.crop.trim().is_empty() {
            return Err(AnalysisError::invalid(Stage::Inputs, "crop", "must not be empty"));
        }
        ensure_positive(Stage::Inputs, "area", self.area_ha)?;
        ensure_positive(Stage::Inputs, "expected price", self.expected_price)?;
        self.costs.validate()?;
        self.agronomic.validate(Stage::Inputs)?;

        let (start_date, end_date) = self
            .dates
            .ok_or_else(|| AnalysisError::invalid(Stage::Inputs, "campaign dates", "must be set"))?;
        if end_date <= start_date {
            return Err(AnalysisError::invalid(
                Stage::Inputs,
                "campaign dates",
                format!("harvest {} must be after sowing {}", end_date, start_date),
            ));
        }
        if let Some(month) = self.sowing_month {
            ensure_month(Stage::Inputs, "sowing month", month)?;
        }

        Ok(ProjectInputs {
            crop: self.crop,
            region: self.region,
            area_ha: self.area_ha,
            start_date,
            end_date,
            expected_price: self.expected_price,
            costs: self.costs,
            agronomic: self.agronomic,
            sowing_month: self.sowing_month,
        })
    }
}
