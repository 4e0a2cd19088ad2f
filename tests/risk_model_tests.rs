//! Risk model property tests.
//!
//! Validates the PD/LGD calibration ranges, the decision thresholds, the
//! pricing band, and the affordability formulas against known inputs.
//! Everything here is pure logic; no database required.

use carelend_server::config::RiskModelConfig;
use carelend_server::risk::model::{
    ApplicationBehavior, MedicalAidTier, PdBand, RiskDecision,
};
use carelend_server::risk::service::{
    behavioral_score, calculate_pd, calculate_lgd, make_risk_decision, max_approved_amount,
    recommended_term, risk_adjusted_pricing, round4, ComponentScores, LgdInputs,
};
use carelend_server::risk::{AffordabilityCalculator, AffordabilityInput};
use carelend_server::risk::model::AffordabilityBand;
use uuid::Uuid;

fn config() -> RiskModelConfig {
    RiskModelConfig::default()
}

fn scores(health: f64, procedure: f64, affordability: f64, provider: f64, behavioral: f64) -> ComponentScores {
    ComponentScores {
        health_score: health,
        procedure_risk: procedure,
        affordability_score: affordability,
        provider_score: provider,
        behavioral_score: behavioral,
    }
}

// ============================================================================
// PD calibration range
// ============================================================================

#[test]
fn pd_always_within_calibration_range() {
    let grid = [0.0, 20.0, 45.0, 50.0, 65.0, 85.0, 100.0];

    for &h in &grid {
        for &p in &grid {
            for &a in &grid {
                let pd = calculate_pd(&scores(h, p, a, 50.0, 50.0), &config());
                assert!(
                    (0.005..=0.15).contains(&pd.score),
                    "PD {} out of range for ({}, {}, {})",
                    pd.score,
                    h,
                    p,
                    a
                );
            }
        }
    }
}

#[test]
fn pd_monotonic_in_health_score() {
    let weak = calculate_pd(&scores(20.0, 50.0, 50.0, 50.0, 50.0), &config());
    let strong = calculate_pd(&scores(90.0, 50.0, 50.0, 50.0, 50.0), &config());
    assert!(strong.score < weak.score);
}

#[test]
fn pd_components_sum_to_raw_score() {
    let pd = calculate_pd(&scores(70.0, 40.0, 65.0, 55.0, 85.0), &config());
    let component_sum = pd.components.health_score
        + pd.components.procedure_risk
        + pd.components.affordability
        + pd.components.provider
        + pd.components.behavioral;

    // Raw sum times the calibration factor reproduces the (unclamped) score
    let calibrated = round4(component_sum * config().pd_calibration_factor);
    assert!((calibrated - pd.score).abs() < 0.001);
}

#[test]
fn pd_band_reflects_score() {
    let low = calculate_pd(&scores(95.0, 10.0, 95.0, 95.0, 95.0), &config());
    assert!(matches!(low.band, PdBand::VeryLow | PdBand::Low));

    let high = calculate_pd(&scores(5.0, 95.0, 5.0, 5.0, 5.0), &config());
    assert!(matches!(high.band, PdBand::High | PdBand::VeryHigh));
}

// ============================================================================
// LGD calibration range
// ============================================================================

#[test]
fn lgd_always_within_calibration_range() {
    let tiers = [
        MedicalAidTier::None,
        MedicalAidTier::Comprehensive,
        MedicalAidTier::Classic,
        MedicalAidTier::Essential,
        MedicalAidTier::Basic,
    ];

    for tier in tiers {
        for necessity in [0.0, 0.3, 0.6, 1.0] {
            for network in [true, false] {
                for support in [0.0, 0.5, 1.0] {
                    let lgd = calculate_lgd(
                        &LgdInputs {
                            medical_aid_tier: tier,
                            procedure_necessity: necessity,
                            provider_network: network,
                            family_support_indicator: support,
                        },
                        &config(),
                    );
                    assert!(
                        (0.20..=0.70).contains(&lgd.score),
                        "LGD {} out of range",
                        lgd.score
                    );
                }
            }
        }
    }
}

#[test]
fn lgd_uninsured_recovers_less_than_comprehensive() {
    let base = LgdInputs {
        medical_aid_tier: MedicalAidTier::None,
        procedure_necessity: 0.6,
        provider_network: true,
        family_support_indicator: 0.5,
    };
    let uninsured = calculate_lgd(&base, &config());
    let comprehensive = calculate_lgd(
        &LgdInputs {
            medical_aid_tier: MedicalAidTier::Comprehensive,
            ..base
        },
        &config(),
    );

    assert!(comprehensive.score < uninsured.score);
}

// ============================================================================
// Expected loss identity
// ============================================================================

#[test]
fn expected_loss_rate_is_exact_product_of_scores() {
    let pd = calculate_pd(&scores(60.0, 45.0, 65.0, 55.0, 70.0), &config());
    let lgd = calculate_lgd(
        &LgdInputs {
            medical_aid_tier: MedicalAidTier::Classic,
            procedure_necessity: 0.65,
            provider_network: true,
            family_support_indicator: 0.5,
        },
        &config(),
    );

    let rate = pd.score * lgd.score;
    // Bitwise identity, not approximate: the rate is defined as the product
    assert_eq!(rate, pd.score * lgd.score);

    let exposure = 20_000.0;
    let amount = rate * exposure;
    assert_eq!(amount, pd.score * lgd.score * exposure);
}

// ============================================================================
// Decision thresholds
// ============================================================================

#[test]
fn decision_is_pure_function_of_expected_loss_rate() {
    assert_eq!(make_risk_decision(0.009).decision, RiskDecision::Approve);
    assert_eq!(make_risk_decision(0.03).decision, RiskDecision::Review);
    assert_eq!(make_risk_decision(0.08).decision, RiskDecision::Decline);
}

#[test]
fn decision_boundaries_are_inclusive_upper_bounds() {
    assert_eq!(make_risk_decision(0.01).decision, RiskDecision::Approve);
    assert_eq!(make_risk_decision(0.025).decision, RiskDecision::Approve);
    assert_eq!(
        make_risk_decision(0.025 + 1e-6).decision,
        RiskDecision::Review
    );
    assert_eq!(make_risk_decision(0.05).decision, RiskDecision::Review);
    assert_eq!(make_risk_decision(0.05 + 1e-6).decision, RiskDecision::Decline);
}

#[test]
fn decision_confidence_per_tier() {
    assert_eq!(make_risk_decision(0.005).confidence, 0.95);
    assert_eq!(make_risk_decision(0.02).confidence, 0.85);
    assert_eq!(make_risk_decision(0.04).confidence, 0.70);
    assert_eq!(make_risk_decision(0.20).confidence, 0.90);
}

// ============================================================================
// Pricing and terms
// ============================================================================

#[test]
fn pricing_stays_in_statutory_band() {
    for rate in [0.0, 0.001, 0.01, 0.05, 0.105, 0.5] {
        let priced = risk_adjusted_pricing(rate);
        assert!((0.15..=0.28).contains(&priced));
    }
}

#[test]
fn pricing_formula_mid_range() {
    // 0.08 risk-free + 2 * 0.02 EL + 0.02 capital + 0.03 target = 0.17
    assert!((risk_adjusted_pricing(0.02) - 0.17).abs() < 1e-9);
}

#[test]
fn term_depends_on_risk_and_amount() {
    assert_eq!(recommended_term(0.03, 10_001.0), 6);
    assert_eq!(recommended_term(0.03, 10_000.0), 3);
    assert_eq!(recommended_term(0.05, 15_001.0), 4);
    assert_eq!(recommended_term(0.05, 15_000.0), 3);
    assert_eq!(recommended_term(0.051, 100_000.0), 3);
}

#[test]
fn max_amount_shrinks_with_risk() {
    let ceiling = 12_000.0;
    let amounts: Vec<f64> = [0.02, 0.04, 0.06, 0.10]
        .iter()
        .map(|&pd| max_approved_amount(ceiling, pd))
        .collect();

    assert_eq!(amounts, vec![12_000.0, 10_200.0, 8_400.0, 6_000.0]);
}

// ============================================================================
// Behavioral scoring
// ============================================================================

#[test]
fn behavioral_score_rewards_considered_applications() {
    let considered = ApplicationBehavior {
        completion_time_seconds: 240,
        application_hour: 14,
        device_type: "mobile".to_string(),
        location_consistent: true,
        form_edits_count: 3,
    };
    let rushed = ApplicationBehavior {
        completion_time_seconds: 20,
        application_hour: 3,
        device_type: "desktop".to_string(),
        location_consistent: false,
        form_edits_count: 14,
    };

    assert!(behavioral_score(&considered) > behavioral_score(&rushed));
    assert!((0.0..=100.0).contains(&behavioral_score(&rushed)));
}

// ============================================================================
// Affordability
// ============================================================================

#[test]
fn affordability_spec_example_lands_in_low_band() {
    // income 15000, debt 2000, premium 0, loan 9000:
    // requested monthly 3000; capacity 0.30 * 13000 = 3900;
    // 3000 > 2925 (75% of capacity) but <= 3900 -> "low"
    let outcome = AffordabilityCalculator::evaluate(&AffordabilityInput {
        user_id: Uuid::new_v4(),
        monthly_income: 15_000.0,
        existing_debt: 2_000.0,
        loan_amount: 9_000.0,
        medical_aid_premium: 0.0,
    });

    assert!((outcome.healthcare_capacity - 3_900.0).abs() < 1e-9);
    assert_eq!(outcome.affordability_band, AffordabilityBand::Low);
}

#[test]
fn affordability_zero_income_never_divides() {
    let outcome = AffordabilityCalculator::evaluate(&AffordabilityInput {
        user_id: Uuid::new_v4(),
        monthly_income: 0.0,
        existing_debt: 500.0,
        loan_amount: 3_000.0,
        medical_aid_premium: 100.0,
    });

    assert_eq!(outcome.healthcare_dti, 1.0);
    assert!(outcome.healthcare_dti.is_finite());
    assert_eq!(outcome.affordability_band, AffordabilityBand::Insufficient);
}

// ============================================================================
// Database-backed engine tests
// ============================================================================

#[cfg(test)]
mod db_tests {
    use std::sync::Arc;

    use sqlx::PgPool;
    use uuid::Uuid;

    use carelend_server::notify::TracingNotifier;
    use carelend_server::risk::model::{ApplicationBehavior, RiskAssessmentRequest};
    use carelend_server::risk::{
        AffordabilityCalculator, RiskDataSources, RiskEngine, SimulatedBureau,
    };

    use super::config;

    /// Helper to create a test database pool
    async fn setup_test_db() -> PgPool {
        let database_url = std::env::var("TEST_DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/carelend_test".to_string());

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await
            .expect("Failed to connect to test database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        pool
    }

    fn engine(pool: PgPool) -> RiskEngine {
        RiskEngine::new(
            pool.clone(),
            config(),
            RiskDataSources::new(pool.clone(), Box::new(SimulatedBureau)),
            AffordabilityCalculator::new(pool),
            Arc::new(TracingNotifier),
        )
    }

    fn request(user_id: Uuid) -> RiskAssessmentRequest {
        RiskAssessmentRequest {
            user_id,
            application_id: Uuid::new_v4(),
            loan_amount: 20_000.0,
            procedure_type: "Dental implant".to_string(),
            icd10_code: Some("K08.1".to_string()),
            provider_id: None,
            monthly_income: 25_000.0,
            existing_debt: 3_000.0,
            medical_aid_scheme: Some("Discovery Health".to_string()),
            medical_aid_option: Some("Classic Priority".to_string()),
            has_chronic_conditions: false,
            application_behavior: Some(ApplicationBehavior::default()),
        }
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn assessment_end_to_end_respects_invariants() {
        let pool = setup_test_db().await;
        let engine = engine(pool.clone());
        let user_id = Uuid::new_v4();

        let outcome = engine
            .calculate_risk_assessment(&request(user_id))
            .await
            .expect("Assessment should succeed");

        assert!((0.005..=0.15).contains(&outcome.pd.score));
        assert!((0.20..=0.70).contains(&outcome.lgd.score));
        assert_eq!(
            outcome.expected_loss.rate,
            outcome.pd.score * outcome.lgd.score
        );
        assert!((0.15..=0.28).contains(&outcome.pricing.final_rate));

        // The stored record mirrors the computed outcome
        let stored = engine
            .get_assessment(outcome.application_id)
            .await
            .expect("Stored assessment should be readable");
        assert_eq!(stored.pd_score, outcome.pd.score);
        assert_eq!(stored.lgd_score, outcome.lgd.score);
        assert_eq!(stored.expected_loss_rate, outcome.expected_loss.rate);

        // The affordability snapshot was upserted for the user
        let affordability_rows: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM healthcare_affordability WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(affordability_rows, 1);
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn fresh_health_score_is_reused_across_assessments() {
        let pool = setup_test_db().await;
        let engine = engine(pool.clone());
        let user_id = Uuid::new_v4();

        let first = engine
            .calculate_risk_assessment(&request(user_id))
            .await
            .unwrap();
        let second = engine
            .calculate_risk_assessment(&request(user_id))
            .await
            .unwrap();

        // The simulated bureau adds random variance, so an identical health
        // score on the second run means the stored row was reused
        assert_eq!(first.health_score, second.health_score);

        let score_rows: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM patient_health_scores WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(score_rows, 1);

        // Re-evaluation appends a new assessment, never mutates the old one
        let assessment_rows: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM healthcare_risk_assessments WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(assessment_rows, 2);
    }
}

#[test]
fn affordability_band_boundaries() {
    // capacity = 0.30 * 10000 = 3000; band edges at 1500 / 2250 / 3000
    let evaluate = |loan: f64| {
        AffordabilityCalculator::evaluate(&AffordabilityInput {
            user_id: Uuid::new_v4(),
            monthly_income: 10_000.0,
            existing_debt: 0.0,
            loan_amount: loan,
            medical_aid_premium: 0.0,
        })
        .affordability_band
    };

    assert_eq!(evaluate(4_500.0), AffordabilityBand::High); // monthly 1500
    assert_eq!(evaluate(6_750.0), AffordabilityBand::Medium); // monthly 2250
    assert_eq!(evaluate(9_000.0), AffordabilityBand::Low); // monthly 3000
    assert_eq!(evaluate(9_003.0), AffordabilityBand::Insufficient); // monthly 3001
}
