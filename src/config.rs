//! Analysis configuration
//!
//! Every field has a default, so a config file only needs the values it
//! overrides:
//!
//! ```json
//! { "discount_rate": 0.10, "seed": 42 }
//! ```

use crate::models::scenario::{ScenarioSet, SweepSettings};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const DEFAULT_DISCOUNT_RATE: f64 = 0.12;
pub const DEFAULT_MONTE_CARLO_SAMPLES: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Annual discount rate, applied monthly as rate / 12
    pub discount_rate: f64,
    pub monte_carlo_samples: usize,
    /// Fixed RNG seed; entropy-seeded when absent
    pub seed: Option<u64>,
    pub scenarios: ScenarioSet,
    pub sweep: SweepSettings,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            discount_rate: DEFAULT_DISCOUNT_RATE,
            monte_carlo_samples: DEFAULT_MONTE_CARLO_SAMPLES,
            seed: None,
            scenarios: ScenarioSet::default(),
            sweep: SweepSettings::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read analysis config: {:?}", path))?;

        let config: AnalysisConfig =
            serde_json::from_str(&contents).with_context(|| "Failed to parse analysis config JSON")?;

        config
            .validate()
            .with_context(|| format!("Invalid analysis config: {:?}", path))?;

        Ok(config)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.discount_rate.is_finite() || self.discount_rate < 0.0 {
            anyhow::bail!("discount_rate must be a non-negative number, got {}", self.discount_rate);
        }
        if self.monte_carlo_samples == 0 {
            anyhow::bail!("monte_carlo_samples must be at least 1");
        }
        self.scenarios.validate()?;
        self.sweep.validate()?;
        Ok(())
    }
}
