//! Pipeline Integration Tests
//!
//! Runs complete campaign analyses through the public API as sanity checks:
//! a profitable maize campaign, a loss-making one, an unknown region and a
//! parallel batch.

use approx::assert_relative_eq;
use campaign_scorer::{
    AgronomicInputs, AnalysisConfig, AnalysisError, CampaignAnalyzer, CostBreakdown, ProjectInputs,
    RecommendationCategory, ReferenceData, RiskCategory, RiskEngine, SensitivityVariable,
};
use chrono::NaiveDate;
use std::sync::Arc;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn standard_costs() -> CostBreakdown {
    CostBreakdown {
        labor: 5000.0,
        seed: 1500.0,
        fertilizer: 2000.0,
        water: 800.0,
        machinery: 3000.0,
        other: 1000.0,
    }
}

/// Maize in Lima, 5 ha, 150-day campaign sown in September
fn maize_campaign(price: f64, costs: CostBreakdown) -> ProjectInputs {
    ProjectInputs::builder("Maize", "Lima")
        .area_ha(5.0)
        .campaign(date(2025, 9, 1), date(2026, 1, 29))
        .expected_price(price)
        .costs(costs)
        .agronomic(AgronomicInputs::default())
        .build()
        .unwrap()
}

fn analyzer() -> CampaignAnalyzer {
    CampaignAnalyzer::new(
        Arc::new(ReferenceData::builtin()),
        AnalysisConfig::default().with_seed(2025),
    )
}

#[test]
fn test_profitable_maize_campaign() {
    let analysis = analyzer().analyze(&maize_campaign(2.5, standard_costs())).unwrap();

    // f = 0.21 + 0.21 + 0.15 + 0.075, Lima factor 0.95
    assert_relative_eq!(analysis.prediction.adjustment_factor, 0.645, epsilon = 1e-12);
    assert_relative_eq!(analysis.prediction.likely_kg_ha, 4902.0, epsilon = 1e-9);
    assert_eq!(analysis.prediction.optimal_month, Some(true));

    // September is a high-risk month in Lima
    assert_eq!(analysis.risk.climate.seasonal_factor, 1.15);
    assert!(analysis.risk.ira > 0.33 && analysis.risk.ira < 0.40);
    assert_eq!(analysis.risk.category, RiskCategory::Medium);

    assert_relative_eq!(analysis.financial.revenue, 61_275.0, epsilon = 1e-6);
    assert_relative_eq!(analysis.financial.break_even_kg, 5320.0, epsilon = 1e-9);
    assert_relative_eq!(analysis.financial.break_even_kg_ha, 1064.0, epsilon = 1e-9);
    assert_eq!(analysis.financial.schedule.len(), 6);
    assert!(analysis.financial.viable);
    assert!(analysis.financial.irr_annual.is_some());

    assert_eq!(analysis.score.profitability, 40);
    assert_eq!(analysis.score.risk, 25);
    assert_eq!(analysis.score.scenario_stability, 20);
    assert_eq!(analysis.score.market, 9);
    assert_eq!(analysis.score.total, 94);
    assert_eq!(analysis.score.recommendation, RecommendationCategory::Proceed);
}

#[test]
fn test_loss_making_campaign_is_rejected() {
    let costs = CostBreakdown {
        labor: 100_000.0,
        ..CostBreakdown::default()
    };
    let analysis = analyzer().analyze(&maize_campaign(0.5, costs)).unwrap();

    assert!(!analysis.financial.viable);
    assert!(analysis.financial.npv < 0.0);
    assert_eq!(analysis.financial.payback_period, None);
    assert_eq!(analysis.score.profitability, 0);
    assert_eq!(analysis.score.recommendation, RecommendationCategory::DoNotPlant);
    assert!(analysis.profit_distribution.loss_probability > 0.9);
}

#[test]
fn test_sensitivity_sweeps_cover_all_variables() {
    let analysis = analyzer().analyze(&maize_campaign(2.5, standard_costs())).unwrap();
    let variables: Vec<SensitivityVariable> = analysis.sensitivity.iter().map(|s| s.variable).collect();
    assert_eq!(
        variables,
        vec![SensitivityVariable::Yield, SensitivityVariable::Price, SensitivityVariable::Joint]
    );

    let base_npv = analysis.financial.npv;
    for sweep in &analysis.sensitivity {
        assert_eq!(sweep.points.len(), 9);
        assert_eq!(sweep.points.first().unwrap().perturbation_pct, -40.0);
        assert_eq!(sweep.points.last().unwrap().perturbation_pct, 40.0);
        assert_relative_eq!(sweep.points[4].npv, base_npv, epsilon = 1e-6);
    }
}

#[test]
fn test_unknown_region_degrades_gracefully() {
    let inputs = ProjectInputs::builder("Potato", "Atlantis")
        .area_ha(2.0)
        .campaign(date(2025, 8, 15), date(2026, 1, 15))
        .expected_price(1.2)
        .costs(standard_costs())
        .build()
        .unwrap();

    let analysis = analyzer().analyze(&inputs).unwrap();
    assert!(!analysis.prediction.region_known);
    assert_eq!(analysis.prediction.region_factor, 0.9);
    assert_eq!(analysis.region, "Atlantis");

    // Climate falls back to Lima, including its August high-risk season
    let lima = RiskEngine::new(Arc::new(ReferenceData::builtin()))
        .climate_risk("Lima", Some(8))
        .unwrap();
    assert_eq!(analysis.risk.climate, lima);
    assert_eq!(analysis.risk.climate.components.drought, 0.30);
    assert_eq!(analysis.risk.climate.components.frost, 0.10);
    assert_eq!(analysis.risk.climate.components.flood, 0.20);
    assert_eq!(analysis.risk.climate.seasonal_factor, 1.15);
}

#[test]
fn test_invalid_inputs_are_rejected_at_construction() {
    let err = ProjectInputs::builder("Maize", "Lima")
        .area_ha(5.0)
        .campaign(date(2026, 1, 1), date(2025, 9, 1))
        .expected_price(2.5)
        .costs(standard_costs())
        .build()
        .unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidInput { field: "campaign dates", .. }));
}

#[test]
fn test_batch_analysis_preserves_order() {
    let analyzer = analyzer();
    let batch = vec![
        maize_campaign(2.5, standard_costs()),
        ProjectInputs::builder("Mango", "Lima")
            .area_ha(1.0)
            .campaign(date(2025, 9, 1), date(2026, 1, 29))
            .expected_price(2.0)
            .costs(standard_costs())
            .build()
            .unwrap(),
        maize_campaign(0.5, standard_costs()),
    ];

    let results = analyzer.analyze_batch(&batch);
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].as_ref().unwrap().crop, "Maize");
    assert!(matches!(results[1], Err(AnalysisError::NotFound { .. })));
    assert!(results[2].is_ok());

    // Same seed, same batch, same answers
    let again = analyzer.analyze_batch(&batch);
    assert_eq!(results, again);
}

#[test]
fn test_analysis_serializes_to_json() {
    let analysis = analyzer().analyze(&maize_campaign(2.5, standard_costs())).unwrap();
    let json = serde_json::to_value(&analysis).unwrap();

    assert_eq!(json["score"]["recommendation"], "Proceed");
    assert_eq!(json["risk"]["category"], "MEDIUM");
    assert_eq!(json["scenarios"].as_array().unwrap().len(), 3);
    assert_eq!(json["scenarios"][0]["name"], "Pessimistic");
}
