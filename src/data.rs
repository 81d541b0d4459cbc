//! Reference Data
//!
//! Crop and region tables shared read-only by every stage of the pipeline.
//! Built once (either from the built-in tables or from a JSON file) and handed
//! to each component behind an `Arc`.
//!
//! JSON layout mirrors the types directly:
//! ```json
//! { "crops": [ { "name": "Maize", "yield_min_kg_ha": 4000, ... } ],
//!   "regions": [ { "name": "Lima", "adjustment_factor": 0.95, ... } ] }
//! ```

use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Region adjustment factor used when a region is not in the tables
pub const DEFAULT_REGION_FACTOR: f64 = 0.9;

/// Region whose climate profile stands in for regions missing from the tables
pub const FALLBACK_CLIMATE_REGION: &str = "Lima";

/// Seasonal multiplier applied to climate risk in a region's high-risk months
pub const DEFAULT_SEASONAL_RISK_MULTIPLIER: f64 = 1.15;

/// Average temperature assumed when a region does not report one (°C)
pub const DEFAULT_AVG_TEMPERATURE: f64 = 20.0;

const ALL_YEAR: [u32; 12] = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12];

/// Per-crop agronomic and market baseline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropReference {
    pub name: String,
    pub yield_min_kg_ha: f64,
    pub yield_mean_kg_ha: f64,
    pub yield_max_kg_ha: f64,
    /// Months (1-12) in which sowing carries no seasonal penalty
    #[serde(default)]
    pub optimal_sowing_months: Vec<u32>,
    /// Coefficient of variation of historical prices
    pub price_volatility: f64,
    /// Mean historical sale price (currency/kg), when known
    #[serde(default)]
    pub historical_mean_price: Option<f64>,
}

impl CropReference {
    pub fn is_optimal_month(&self, month: u32) -> bool {
        self.optimal_sowing_months.contains(&month)
    }
}

/// Drought, frost and flood probabilities for a region
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClimateProfile {
    pub drought: f64,
    pub frost: f64,
    pub flood: f64,
    #[serde(default)]
    pub avg_temperature: Option<f64>,
}

impl Default for ClimateProfile {
    fn default() -> Self {
        Self {
            drought: 0.30,
            frost: 0.20,
            flood: 0.25,
            avg_temperature: Some(DEFAULT_AVG_TEMPERATURE),
        }
    }
}

/// Per-region yield penalty and climate exposure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionReference {
    pub name: String,
    /// Regional yield factor (0-1)
    pub adjustment_factor: f64,
    pub climate: ClimateProfile,
    #[serde(default)]
    pub high_risk_months: Vec<u32>,
    #[serde(default = "default_seasonal_multiplier")]
    pub seasonal_risk_multiplier: f64,
    /// Water availability label ("low", "medium", "high")
    #[serde(default)]
    pub water_availability: Option<String>,
}

fn default_seasonal_multiplier() -> f64 {
    DEFAULT_SEASONAL_RISK_MULTIPLIER
}

impl RegionReference {
    /// Climate risk multiplier for a sowing month
    pub fn seasonal_factor(&self, month: u32) -> f64 {
        if self.high_risk_months.contains(&month) {
            self.seasonal_risk_multiplier
        } else {
            1.0
        }
    }

    pub fn has_limited_water(&self) -> bool {
        matches!(
            self.water_availability.as_deref().map(str::to_lowercase).as_deref(),
            Some("low") | Some("medium")
        )
    }
}

#[derive(Debug, Deserialize)]
struct ReferenceFile {
    crops: Vec<CropReference>,
    #[serde(default)]
    regions: Vec<RegionReference>,
}

/// Crop and region lookup tables
///
/// Keys are lowercased names, so lookups are case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    crops: FxHashMap<String, CropReference>,
    regions: FxHashMap<String, RegionReference>,
}

impl ReferenceData {
    pub fn new(crops: Vec<CropReference>, regions: Vec<RegionReference>) -> Self {
        let mut data = Self::default();
        for crop in crops {
            data.crops.insert(crop.name.to_lowercase(), crop);
        }
        for region in regions {
            data.regions.insert(region.name.to_lowercase(), region);
        }
        data
    }

    /// Load reference tables from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read reference data file: {:?}", path))?;

        let file: ReferenceFile = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse reference data JSON: {:?}", path))?;

        for crop in &file.crops {
            validate_crop(crop)?;
        }
        for region in &file.regions {
            validate_region(region)?;
        }

        tracing::info!(
            crops = file.crops.len(),
            regions = file.regions.len(),
            "loaded reference data from {:?}",
            path
        );

        Ok(Self::new(file.crops, file.regions))
    }

    /// Tables shipped with the crate
    pub fn builtin() -> Self {
        let crops = vec![
            crop("Maize", (4000.0, 8000.0, 12000.0), &[9, 10, 11], 0.25, 2.20),
            crop("Potato", (15000.0, 25000.0, 35000.0), &[8, 9, 10], 0.35, 1.10),
            crop("Rice", (6000.0, 9000.0, 12000.0), &[11, 12, 1], 0.20, 1.60),
            crop("Wheat", (2500.0, 4000.0, 6000.0), &[4, 5, 6], 0.22, 1.80),
            crop("Quinoa", (1200.0, 2000.0, 3000.0), &[8, 9, 10], 0.30, 6.50),
            crop("Asparagus", (8000.0, 12000.0, 18000.0), &ALL_YEAR, 0.28, 4.50),
            crop("Avocado", (8000.0, 15000.0, 22000.0), &ALL_YEAR, 0.32, 5.50),
            crop("Coffee", (800.0, 1500.0, 2500.0), &[4, 5, 6], 0.40, 9.00),
            crop("Cocoa", (600.0, 1200.0, 2000.0), &ALL_YEAR, 0.38, 8.50),
            crop("Cotton", (2500.0, 4000.0, 6000.0), &[8, 9, 10], 0.35, 3.20),
        ];

        let regions = vec![
            region("Lima", 0.95, (0.30, 0.10, 0.20), &[6, 7, 8, 9]),
            region("Arequipa", 0.90, (0.40, 0.30, 0.15), &[6, 7, 8]),
            region("La Libertad", 0.92, (0.25, 0.15, 0.30), &[]),
            region("Lambayeque", 0.88, (0.35, 0.05, 0.40), &[]),
            region("Piura", 0.85, (0.45, 0.05, 0.35), &[1, 2, 3, 4]),
            region("Ica", 0.93, (0.50, 0.10, 0.10), &[]),
            region("Junín", 0.87, (0.20, 0.40, 0.35), &[1, 2, 3, 12]),
            region("Cajamarca", 0.86, (0.25, 0.35, 0.40), &[]),
            region("Cusco", 0.84, (0.20, 0.50, 0.30), &[1, 2, 3, 12]),
            region("Ancash", 0.89, (0.30, 0.40, 0.35), &[]),
            region("Ayacucho", 0.85, (0.35, 0.40, 0.30), &[]),
            region("Huánuco", 0.86, (0.20, 0.35, 0.45), &[]),
            region("San Martín", 0.91, (0.15, 0.10, 0.50), &[]),
        ];

        Self::new(crops, regions)
    }

    pub fn crop(&self, name: &str) -> Option<&CropReference> {
        self.crops.get(&name.to_lowercase())
    }

    pub fn region(&self, name: &str) -> Option<&RegionReference> {
        self.regions.get(&name.to_lowercase())
    }

    /// Crop names, sorted for stable display
    pub fn crop_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.crops.values().map(|c| c.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn region_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.regions.values().map(|r| r.name.as_str()).collect();
        names.sort_unstable();
        names
    }
}

fn crop(name: &str, yields: (f64, f64, f64), months: &[u32], volatility: f64, price: f64) -> CropReference {
    CropReference {
        name: name.to_string(),
        yield_min_kg_ha: yields.0,
        yield_mean_kg_ha: yields.1,
        yield_max_kg_ha: yields.2,
        optimal_sowing_months: months.to_vec(),
        price_volatility: volatility,
        historical_mean_price: Some(price),
    }
}

fn region(name: &str, factor: f64, climate: (f64, f64, f64), high_risk_months: &[u32]) -> RegionReference {
    RegionReference {
        name: name.to_string(),
        adjustment_factor: factor,
        climate: ClimateProfile {
            drought: climate.0,
            frost: climate.1,
            flood: climate.2,
            avg_temperature: None,
        },
        high_risk_months: high_risk_months.to_vec(),
        seasonal_risk_multiplier: DEFAULT_SEASONAL_RISK_MULTIPLIER,
        water_availability: None,
    }
}

fn validate_crop(crop: &CropReference) -> Result<()> {
    if !(crop.yield_min_kg_ha >= 0.0
        && crop.yield_min_kg_ha <= crop.yield_mean_kg_ha
        && crop.yield_mean_kg_ha <= crop.yield_max_kg_ha)
    {
        anyhow::bail!(
            "Crop '{}' must satisfy 0 <= min <= mean <= max yields",
            crop.name
        );
    }
    if !(crop.price_volatility >= 0.0) {
        anyhow::bail!("Crop '{}' has negative price volatility", crop.name);
    }
    if let Some(month) = crop.optimal_sowing_months.iter().find(|m| !(1..=12).contains(*m)) {
        anyhow::bail!("Crop '{}' lists invalid sowing month {}", crop.name, month);
    }
    Ok(())
}

fn validate_region(region: &RegionReference) -> Result<()> {
    let probabilities = [
        ("adjustment_factor", region.adjustment_factor),
        ("drought", region.climate.drought),
        ("frost", region.climate.frost),
        ("flood", region.climate.flood),
    ];
    for (field, value) in probabilities {
        if !(0.0..=1.0).contains(&value) {
            anyhow::bail!("Region '{}' has {} outside [0, 1]: {}", region.name, field, value);
        }
    }
    if let Some(month) = region.high_risk_months.iter().find(|m| !(1..=12).contains(*m)) {
        anyhow::bail!("Region '{}' lists invalid high-risk month {}", region.name, month);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_lookup_is_case_insensitive() {
        let data = ReferenceData::builtin();
        let maize = data.crop("maize").expect("maize is built in");
        assert_eq!(maize.name, "Maize");
        assert_eq!(maize.yield_mean_kg_ha, 8000.0);
        assert_eq!(maize.historical_mean_price, Some(2.20));
        assert!(data.region(FALLBACK_CLIMATE_REGION).is_some());
        assert!(data.region("CUSCO").is_some());
        assert!(data.crop("Mango").is_none());
        assert!(data.region("Atlantis").is_none());
    }

    #[test]
    fn test_seasonal_factor() {
        let data = ReferenceData::builtin();
        let lima = data.region("Lima").unwrap();
        assert_eq!(lima.seasonal_factor(7), 1.15);
        assert_eq!(lima.seasonal_factor(1), 1.0);
    }

    #[test]
    fn test_limited_water_label() {
        let mut region = ReferenceData::builtin().region("Ica").unwrap().clone();
        assert!(!region.has_limited_water());
        region.water_availability = Some("Medium".to_string());
        assert!(region.has_limited_water());
        region.water_availability = Some("high".to_string());
        assert!(!region.has_limited_water());
    }

    #[test]
    fn test_load_from_json() {
        let json = r#"{
            "crops": [{
                "name": "Quinoa",
                "yield_min_kg_ha": 800,
                "yield_mean_kg_ha": 1600,
                "yield_max_kg_ha": 2500,
                "optimal_sowing_months": [8, 9, 10],
                "price_volatility": 0.30,
                "historical_mean_price": 6.5
            }],
            "regions": [{
                "name": "Puno",
                "adjustment_factor": 0.8,
                "climate": { "drought": 0.3, "frost": 0.6, "flood": 0.2, "avg_temperature": 9.0 },
                "high_risk_months": [6, 7]
            }]
        }"#;

        let path = std::env::temp_dir().join("campaign_scorer_reference_test.json");
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let data = ReferenceData::load(&path).unwrap();
        let quinoa = data.crop("quinoa").unwrap();
        assert_eq!(quinoa.historical_mean_price, Some(6.5));
        let puno = data.region("Puno").unwrap();
        assert_eq!(puno.seasonal_risk_multiplier, DEFAULT_SEASONAL_RISK_MULTIPLIER);
        assert_eq!(puno.climate.avg_temperature, Some(9.0));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_rejects_inconsistent_yields() {
        let json = r#"{ "crops": [{
            "name": "Broken", "yield_min_kg_ha": 9000, "yield_mean_kg_ha": 8000,
            "yield_max_kg_ha": 12000, "price_volatility": 0.2 }] }"#;
        let path = std::env::temp_dir().join("campaign_scorer_reference_broken.json");
        fs::write(&path, json).unwrap();

        let err = ReferenceData::load(&path).unwrap_err();
        assert!(err.to_string().contains("Broken"));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_missing_file_has_context() {
        let err = ReferenceData::load(Path::new("/nonexistent/reference.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read reference data file"));
    }
}
