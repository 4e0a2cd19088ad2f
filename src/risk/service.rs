//! Risk assessment engine.
//!
//! Proprietary PD (probability of default) and LGD (loss given default)
//! models for healthcare financing. Patients finance essential procedures,
//! not impulse purchases, so the components lean on healthcare-specific
//! signals: medical aid standing, medication adherence, procedure necessity
//! and provider performance alongside affordability and application
//! behavior.

use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::RiskModelConfig;
use crate::error::ApiError;
use crate::notify::{DomainEvent, EventNotifier};
use crate::risk::affordability::{AffordabilityCalculator, AffordabilityInput};
use crate::risk::model::*;
use crate::risk::sources::{
    ProcedureRiskProfile, ProviderPerformance, RiskDataSources, NEUTRAL_SCORE,
};

// ============================================================================
// Model constants
// ============================================================================

/// Quoted base rate the pricing breakdown is reported against
const BASE_RATE: f64 = 0.18;

/// Risk-free reference rate (local prime-ish)
const RISK_FREE_RATE: f64 = 0.08;

/// Regulatory capital charge priced into every loan
const CAPITAL_CHARGE: f64 = 0.02;

/// Target return over cost of risk and capital
const TARGET_RETURN: f64 = 0.03;

/// Expected-loss coverage multiple in the risk premium
const EXPECTED_LOSS_COVERAGE: f64 = 2.0;

/// Statutory rate band
const RATE_FLOOR: f64 = 0.15;
const RATE_CAP: f64 = 0.28;

/// Health payment score blend weights
const HEALTH_WEIGHT_MEDICAL_AID: f64 = 0.25;
const HEALTH_WEIGHT_ADHERENCE: f64 = 0.15;
const HEALTH_WEIGHT_PROVIDER_PAYMENT: f64 = 0.30;
const HEALTH_WEIGHT_PROCEDURE_OUTCOME: f64 = 0.15;
const HEALTH_WEIGHT_UTILIZATION: f64 = 0.15;

/// Days before a stored health score is considered stale
const HEALTH_SCORE_MAX_AGE_DAYS: i64 = 30;

/// Round to four decimal places, the precision everything is persisted at
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

// ============================================================================
// Pure model functions
// ============================================================================

/// Component scores feeding the PD model, each on a 0-100 scale
#[derive(Debug, Clone, Copy)]
pub struct ComponentScores {
    pub health_score: f64,
    pub procedure_risk: f64,
    pub affordability_score: f64,
    pub provider_score: f64,
    pub behavioral_score: f64,
}

/// Calculate probability of default from weighted component scores.
///
/// Components are normalized to 0-1 with higher meaning riskier (score-style
/// components are inverted), weighted, summed, then linearly calibrated into
/// the configured PD range.
pub fn calculate_pd(scores: &ComponentScores, config: &RiskModelConfig) -> PdResult {
    let w = &config.pd_weights;

    let health_component = (100.0 - scores.health_score) / 100.0 * w.health_score;
    let procedure_component = scores.procedure_risk / 100.0 * w.procedure_risk;
    let affordability_component = (100.0 - scores.affordability_score) / 100.0 * w.affordability;
    let provider_component = (100.0 - scores.provider_score) / 100.0 * w.provider_performance;
    let behavioral_component = (100.0 - scores.behavioral_score) / 100.0 * w.behavioral_signals;

    let pd_raw = health_component
        + procedure_component
        + affordability_component
        + provider_component
        + behavioral_component;

    let pd_score = (pd_raw * config.pd_calibration_factor).clamp(config.pd_floor, config.pd_cap);
    let pd_score = round4(pd_score);

    PdResult {
        score: pd_score,
        band: PdBand::from_score(pd_score),
        components: PdComponents {
            health_score: round4(health_component),
            procedure_risk: round4(procedure_component),
            affordability: round4(affordability_component),
            provider: round4(provider_component),
            behavioral: round4(behavioral_component),
        },
    }
}

/// Inputs to the LGD model
#[derive(Debug, Clone, Copy)]
pub struct LgdInputs {
    pub medical_aid_tier: MedicalAidTier,
    pub procedure_necessity: f64,
    pub provider_network: bool,
    pub family_support_indicator: f64,
}

/// Calculate loss given default.
///
/// Recovery channels particular to medical debt: the scheme can reimburse,
/// family tends to step in for essential procedures, and network providers
/// assist with collections.
pub fn calculate_lgd(inputs: &LgdInputs, config: &RiskModelConfig) -> LgdResult {
    let w = &config.lgd_weights;

    let medical_aid_recovery = match inputs.medical_aid_tier {
        MedicalAidTier::None => 0.8,
        MedicalAidTier::Comprehensive => 0.2,
        MedicalAidTier::Classic => 0.35,
        MedicalAidTier::Essential | MedicalAidTier::Basic => 0.5,
    };

    let family_support = 1.0 - inputs.family_support_indicator * inputs.procedure_necessity;
    let procedure_value = 1.0 - inputs.procedure_necessity;
    let provider_recovery = if inputs.provider_network { 0.3 } else { 0.6 };

    let lgd_raw = medical_aid_recovery * w.medical_aid_recovery
        + family_support * w.family_support
        + procedure_value * w.procedure_value
        + provider_recovery * w.provider_recovery;

    let lgd_score = round4(lgd_raw.clamp(config.lgd_floor, config.lgd_cap));

    LgdResult {
        score: lgd_score,
        band: LgdBand::from_score(lgd_score),
        components: LgdComponents {
            medical_aid_recovery: round4(medical_aid_recovery * w.medical_aid_recovery),
            family_support: round4(family_support * w.family_support),
            procedure_value: round4(procedure_value * w.procedure_value),
            provider_recovery: round4(provider_recovery * w.provider_recovery),
        },
    }
}

/// Risk decision as a pure function of the expected-loss rate.
/// Thresholds are inclusive on the upper bound of each tier.
pub fn make_risk_decision(expected_loss_rate: f64) -> DecisionOutcome {
    if expected_loss_rate <= 0.01 {
        DecisionOutcome {
            decision: RiskDecision::Approve,
            reason: "Low expected loss rate".to_string(),
            confidence: 0.95,
        }
    } else if expected_loss_rate <= 0.025 {
        DecisionOutcome {
            decision: RiskDecision::Approve,
            reason: "Acceptable expected loss within risk appetite".to_string(),
            confidence: 0.85,
        }
    } else if expected_loss_rate <= 0.05 {
        DecisionOutcome {
            decision: RiskDecision::Review,
            reason: "Elevated risk - manual review recommended".to_string(),
            confidence: 0.70,
        }
    } else {
        DecisionOutcome {
            decision: RiskDecision::Decline,
            reason: "Expected loss exceeds risk appetite".to_string(),
            confidence: 0.90,
        }
    }
}

/// Risk-adjusted annual rate, clamped to the statutory band
pub fn risk_adjusted_pricing(expected_loss_rate: f64) -> f64 {
    let risk_premium = expected_loss_rate * EXPECTED_LOSS_COVERAGE;
    let final_rate = RISK_FREE_RATE + risk_premium + CAPITAL_CHARGE + TARGET_RETURN;
    final_rate.clamp(RATE_FLOOR, RATE_CAP)
}

/// Recommended term in months: lower risk can carry longer terms,
/// larger amounts may need them
pub fn recommended_term(pd_score: f64, loan_amount: f64) -> i32 {
    if pd_score <= 0.03 {
        if loan_amount > 10_000.0 {
            6
        } else {
            3
        }
    } else if pd_score <= 0.05 {
        if loan_amount > 15_000.0 {
            4
        } else {
            3
        }
    } else {
        3
    }
}

/// Maximum approved amount: the affordability ceiling shaved by risk
pub fn max_approved_amount(affordability_max: f64, pd_score: f64) -> f64 {
    let risk_multiplier = if pd_score <= 0.03 {
        1.0
    } else if pd_score <= 0.05 {
        0.85
    } else if pd_score <= 0.08 {
        0.70
    } else {
        0.50
    };

    (affordability_max * risk_multiplier).round()
}

/// Score behavioral signals from the application flow.
/// Too-fast completion reads as fraud, too-slow as hesitation.
pub fn behavioral_score(behavior: &ApplicationBehavior) -> f64 {
    let mut score: f64 = 60.0;

    let secs = behavior.completion_time_seconds;
    if secs < 60 {
        score -= 15.0;
    } else if secs > 600 {
        score -= 10.0;
    } else if (120..=300).contains(&secs) {
        score += 10.0;
    }

    let hour = behavior.application_hour;
    if (9..=17).contains(&hour) {
        score += 5.0;
    } else if hour <= 5 {
        score -= 10.0;
    }

    if behavior.device_type == "mobile" {
        score += 5.0;
    }

    if behavior.location_consistent {
        score += 5.0;
    } else {
        score -= 10.0;
    }

    let edits = behavior.form_edits_count;
    if (1..=4).contains(&edits) {
        score += 5.0;
    } else if edits > 10 {
        score -= 10.0;
    }

    score.clamp(0.0, 100.0)
}

/// Component scores feeding the health payment score
#[derive(Debug, Clone, Copy)]
pub struct HealthComponents {
    pub medical_aid: f64,
    pub medication_adherence: f64,
    pub provider_payment: f64,
    pub procedure_outcome: f64,
    pub healthcare_utilization: f64,
}

/// Blend component scores into the composite health payment score
pub fn health_payment_score(components: &HealthComponents) -> f64 {
    let score = components.medical_aid * HEALTH_WEIGHT_MEDICAL_AID
        + components.medication_adherence * HEALTH_WEIGHT_ADHERENCE
        + components.provider_payment * HEALTH_WEIGHT_PROVIDER_PAYMENT
        + components.procedure_outcome * HEALTH_WEIGHT_PROCEDURE_OUTCOME
        + components.healthcare_utilization * HEALTH_WEIGHT_UTILIZATION;

    score.round()
}

/// Model confidence grows with data coverage
fn model_confidence(health: &PatientHealthScore, procedure: &ProcedureRiskProfile) -> f64 {
    let mut confidence: f64 = 0.5;

    if health.medical_aid_score > 0.0 {
        confidence += 0.1;
    }
    if health.medication_adherence_score > 0.0 {
        confidence += 0.1;
    }
    if health.provider_payment_score > 0.0 {
        confidence += 0.15;
    }
    if procedure.icd10_code.is_some() {
        confidence += 0.15;
    }

    confidence.min(0.95)
}

// ============================================================================
// Risk engine service
// ============================================================================

/// Risk assessment engine
pub struct RiskEngine {
    pool: PgPool,
    config: RiskModelConfig,
    sources: RiskDataSources,
    affordability: AffordabilityCalculator,
    notifier: Arc<dyn EventNotifier>,
}

impl RiskEngine {
    pub fn new(
        pool: PgPool,
        config: RiskModelConfig,
        sources: RiskDataSources,
        affordability: AffordabilityCalculator,
        notifier: Arc<dyn EventNotifier>,
    ) -> Self {
        Self {
            pool,
            config,
            sources,
            affordability,
            notifier,
        }
    }

    /// Calculate a comprehensive risk assessment for an application.
    ///
    /// Individual data source outages degrade to neutral defaults; the
    /// assessment only fails outright if its own persistence fails, in which
    /// case the submission flow routes the application to manual review.
    pub async fn calculate_risk_assessment(
        &self,
        request: &RiskAssessmentRequest,
    ) -> Result<RiskAssessmentOutcome, ApiError> {
        let health_score = self.get_or_create_health_score(request).await?;

        let procedure_risk = match self
            .sources
            .procedure_risk(&request.procedure_type, request.icd10_code.as_deref())
            .await
        {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(error = %e, "Procedure risk source unavailable, using neutral defaults");
                ProcedureRiskProfile::unknown()
            }
        };

        let medical_aid_premium = if request.medical_aid_scheme.is_some() {
            AffordabilityCalculator::estimate_medical_aid_premium(
                request.medical_aid_option.as_deref(),
            )
        } else {
            0.0
        };

        let affordability_input = AffordabilityInput {
            user_id: request.user_id,
            monthly_income: request.monthly_income,
            existing_debt: request.existing_debt,
            loan_amount: request.loan_amount,
            medical_aid_premium,
        };
        let affordability = match self.affordability.assess(&affordability_input).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, "Affordability persistence failed, using transient result");
                AffordabilityCalculator::evaluate(&affordability_input)
            }
        };

        let provider = match self.sources.provider_performance(request.provider_id).await {
            Ok(performance) => performance,
            Err(e) => {
                tracing::warn!(error = %e, "Provider performance source unavailable, using neutral defaults");
                ProviderPerformance::unknown()
            }
        };

        let behavior = request.application_behavior.clone().unwrap_or_default();
        let behavioral = behavioral_score(&behavior);

        let pd = calculate_pd(
            &ComponentScores {
                health_score: health_score.health_payment_score,
                procedure_risk: procedure_risk.base_pd_risk,
                affordability_score: affordability.affordability_score,
                provider_score: provider.performance_score,
                behavioral_score: behavioral,
            },
            &self.config,
        );

        let lgd = calculate_lgd(
            &LgdInputs {
                medical_aid_tier: MedicalAidTier::from_plan(
                    request.medical_aid_scheme.as_deref(),
                    request.medical_aid_option.as_deref(),
                ),
                procedure_necessity: procedure_risk.necessity_score,
                provider_network: provider.is_network_partner,
                family_support_indicator: health_score.family_support_indicator.unwrap_or(0.5),
            },
            &self.config,
        );

        // The rate is the exact product of the rounded scores; re-rounding
        // would break the pd * lgd identity
        let expected_loss_rate = pd.score * lgd.score;
        let expected_loss = ExpectedLoss {
            exposure: request.loan_amount,
            amount: expected_loss_rate * request.loan_amount,
            rate: expected_loss_rate,
        };

        let decision = make_risk_decision(expected_loss_rate);
        let final_rate = risk_adjusted_pricing(expected_loss_rate);
        let term = recommended_term(pd.score, request.loan_amount);
        let max_amount = max_approved_amount(affordability.max_loan_amount, pd.score);
        let confidence = model_confidence(&health_score, &procedure_risk);

        let assessment_id = self
            .store_assessment(request, &pd, &lgd, &expected_loss, &decision, final_rate, term, max_amount, confidence)
            .await?;

        self.notifier.notify(DomainEvent::AssessmentCompleted {
            assessment_id,
            application_id: request.application_id,
            decision: decision.decision.as_str().to_string(),
        });

        Ok(RiskAssessmentOutcome {
            assessment_id,
            application_id: request.application_id,
            pd,
            lgd,
            expected_loss,
            decision,
            pricing: PricingOutcome {
                base_rate: BASE_RATE,
                risk_premium: final_rate - BASE_RATE,
                final_rate,
            },
            terms: RecommendedTerms {
                recommended_term_months: term,
                max_amount,
            },
            health_score: health_score.health_payment_score,
            affordability_band: affordability.affordability_band,
            model_version: MODEL_VERSION.to_string(),
            model_confidence: confidence,
        })
    }

    /// Fetch the latest stored assessment for an application
    pub async fn get_assessment(
        &self,
        application_id: Uuid,
    ) -> Result<StoredRiskAssessment, ApiError> {
        let assessment = sqlx::query_as::<_, StoredRiskAssessment>(
            r#"
            SELECT * FROM healthcare_risk_assessments
            WHERE application_id = $1
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(application_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!(
                "No risk assessment found for application {}",
                application_id
            ))
        })?;

        Ok(assessment)
    }

    /// Portfolio risk aggregates over the trailing 30 days
    pub async fn portfolio_summary(&self) -> Result<PortfolioRiskSummary, ApiError> {
        let summary = sqlx::query_as::<_, PortfolioRiskSummary>(
            r#"
            SELECT
                COUNT(*) AS total_assessments,
                AVG(pd_score) AS avg_pd,
                AVG(lgd_score) AS avg_lgd,
                AVG(expected_loss_rate) AS avg_expected_loss_rate,
                SUM(exposure_at_default) AS total_exposure,
                SUM(expected_loss) AS total_expected_loss,
                COUNT(*) FILTER (WHERE risk_decision = 'approve') AS approved_count,
                COUNT(*) FILTER (WHERE risk_decision = 'decline') AS declined_count,
                COUNT(*) FILTER (WHERE risk_decision = 'review') AS review_count
            FROM healthcare_risk_assessments
            WHERE created_at >= NOW() - INTERVAL '30 days'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }

    /// Assessment distribution by PD band over the trailing 30 days
    pub async fn risk_distribution(&self) -> Result<Vec<RiskBandDistribution>, ApiError> {
        let rows = sqlx::query_as::<_, RiskBandDistribution>(
            r#"
            SELECT
                pd_band,
                COUNT(*) AS count,
                AVG(pd_score) AS avg_pd,
                AVG(expected_loss_rate) AS avg_el_rate,
                SUM(exposure_at_default) AS total_exposure
            FROM healthcare_risk_assessments
            WHERE created_at >= NOW() - INTERVAL '30 days'
            GROUP BY pd_band
            ORDER BY CASE pd_band
                WHEN 'very_low' THEN 1
                WHEN 'low' THEN 2
                WHEN 'medium' THEN 3
                WHEN 'high' THEN 4
                ELSE 5
            END
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // ========================================================================
    // Private helpers
    // ========================================================================

    /// Return the stored health score if fresh, otherwise recompute from the
    /// data sources and upsert
    async fn get_or_create_health_score(
        &self,
        request: &RiskAssessmentRequest,
    ) -> Result<PatientHealthScore, ApiError> {
        let existing = sqlx::query_as::<_, PatientHealthScore>(
            "SELECT * FROM patient_health_scores WHERE user_id = $1",
        )
        .bind(request.user_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(score) = existing {
            let age = Utc::now() - score.score_calculated_at;
            if age < Duration::days(HEALTH_SCORE_MAX_AGE_DAYS) {
                return Ok(score);
            }
        }

        let medical_aid = self
            .sources
            .medical_aid_score(request.medical_aid_scheme.as_deref());
        let medication_adherence = self
            .sources
            .medication_adherence_score(request.has_chronic_conditions);
        let provider_payment = match self.sources.internal_payment_history(request.user_id).await {
            Ok(history) => history.payment_score,
            Err(e) => {
                tracing::warn!(error = %e, "Internal payment history unavailable, using neutral score");
                NEUTRAL_SCORE
            }
        };

        // Claims-derived placeholders until scheme data feeds land
        let procedure_outcome = 65.0;
        let healthcare_utilization = 60.0;

        let composite = health_payment_score(&HealthComponents {
            medical_aid,
            medication_adherence,
            provider_payment,
            procedure_outcome,
            healthcare_utilization,
        });
        let band = HealthScoreBand::from_score(composite);

        let score = sqlx::query_as::<_, PatientHealthScore>(
            r#"
            INSERT INTO patient_health_scores (
                user_id, health_payment_score, score_band,
                medical_aid_score, medication_adherence_score, provider_payment_score,
                procedure_outcome_score, healthcare_utilization_score,
                chronic_conditions_count, active_medical_aid,
                medical_aid_scheme, medical_aid_option, score_calculated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW())
            ON CONFLICT (user_id)
            DO UPDATE SET
                health_payment_score = EXCLUDED.health_payment_score,
                score_band = EXCLUDED.score_band,
                medical_aid_score = EXCLUDED.medical_aid_score,
                medication_adherence_score = EXCLUDED.medication_adherence_score,
                provider_payment_score = EXCLUDED.provider_payment_score,
                procedure_outcome_score = EXCLUDED.procedure_outcome_score,
                healthcare_utilization_score = EXCLUDED.healthcare_utilization_score,
                chronic_conditions_count = EXCLUDED.chronic_conditions_count,
                active_medical_aid = EXCLUDED.active_medical_aid,
                medical_aid_scheme = EXCLUDED.medical_aid_scheme,
                medical_aid_option = EXCLUDED.medical_aid_option,
                score_calculated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(request.user_id)
        .bind(composite)
        .bind(band.as_str())
        .bind(medical_aid)
        .bind(medication_adherence)
        .bind(provider_payment)
        .bind(procedure_outcome)
        .bind(healthcare_utilization)
        .bind(if request.has_chronic_conditions { 1 } else { 0 })
        .bind(request.medical_aid_scheme.is_some())
        .bind(request.medical_aid_scheme.as_deref())
        .bind(request.medical_aid_option.as_deref())
        .fetch_one(&self.pool)
        .await?;

        Ok(score)
    }

    #[allow(clippy::too_many_arguments)]
    async fn store_assessment(
        &self,
        request: &RiskAssessmentRequest,
        pd: &PdResult,
        lgd: &LgdResult,
        expected_loss: &ExpectedLoss,
        decision: &DecisionOutcome,
        final_rate: f64,
        term: i32,
        max_amount: f64,
        confidence: f64,
    ) -> Result<Uuid, ApiError> {
        let assessment_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO healthcare_risk_assessments (
                application_id, user_id,
                pd_score, pd_band,
                pd_health_score_component, pd_procedure_risk_component,
                pd_affordability_component, pd_provider_component, pd_behavioral_component,
                lgd_score, lgd_band,
                lgd_collateral_component, lgd_family_support_component,
                lgd_procedure_value_component, lgd_provider_recovery_component,
                exposure_at_default, expected_loss, expected_loss_rate,
                risk_decision, risk_adjusted_pricing,
                recommended_term_months, max_approved_amount,
                model_version, model_confidence
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20,
                $21, $22, $23, $24
            )
            RETURNING assessment_id
            "#,
        )
        .bind(request.application_id)
        .bind(request.user_id)
        .bind(pd.score)
        .bind(pd.band.as_str())
        .bind(pd.components.health_score)
        .bind(pd.components.procedure_risk)
        .bind(pd.components.affordability)
        .bind(pd.components.provider)
        .bind(pd.components.behavioral)
        .bind(lgd.score)
        .bind(lgd.band.as_str())
        .bind(lgd.components.medical_aid_recovery)
        .bind(lgd.components.family_support)
        .bind(lgd.components.procedure_value)
        .bind(lgd.components.provider_recovery)
        .bind(expected_loss.exposure)
        .bind(round4(expected_loss.amount))
        .bind(expected_loss.rate)
        .bind(decision.decision.as_str())
        .bind(round4(final_rate))
        .bind(term)
        .bind(max_amount)
        .bind(MODEL_VERSION)
        .bind(confidence)
        .fetch_one(&self.pool)
        .await?;

        Ok(assessment_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RiskModelConfig {
        RiskModelConfig::default()
    }

    fn neutral_scores() -> ComponentScores {
        ComponentScores {
            health_score: 50.0,
            procedure_risk: 50.0,
            affordability_score: 50.0,
            provider_score: 50.0,
            behavioral_score: 50.0,
        }
    }

    #[test]
    fn test_pd_stays_in_calibration_range() {
        let best = ComponentScores {
            health_score: 100.0,
            procedure_risk: 0.0,
            affordability_score: 100.0,
            provider_score: 100.0,
            behavioral_score: 100.0,
        };
        let worst = ComponentScores {
            health_score: 0.0,
            procedure_risk: 100.0,
            affordability_score: 0.0,
            provider_score: 0.0,
            behavioral_score: 0.0,
        };

        let low = calculate_pd(&best, &config());
        let high = calculate_pd(&worst, &config());

        assert_eq!(low.score, 0.005);
        assert_eq!(high.score, 0.15);
        assert!(low.score < calculate_pd(&neutral_scores(), &config()).score);
    }

    #[test]
    fn test_pd_neutral_inputs() {
        // All components at 50 -> raw 0.5, calibrated 0.075
        let pd = calculate_pd(&neutral_scores(), &config());
        assert!((pd.score - 0.075).abs() < 1e-9);
        assert_eq!(pd.band, PdBand::Medium);
    }

    #[test]
    fn test_pd_calibration_factor_is_tunable() {
        let mut tuned = config();
        tuned.pd_calibration_factor = 0.10;

        let default_pd = calculate_pd(&neutral_scores(), &config());
        let tuned_pd = calculate_pd(&neutral_scores(), &tuned);
        assert!(tuned_pd.score < default_pd.score);
        assert!((tuned_pd.score - 0.05).abs() < 1e-9);
    }

    #[test]
    fn test_lgd_stays_in_calibration_range() {
        let best = LgdInputs {
            medical_aid_tier: MedicalAidTier::Comprehensive,
            procedure_necessity: 1.0,
            provider_network: true,
            family_support_indicator: 1.0,
        };
        let worst = LgdInputs {
            medical_aid_tier: MedicalAidTier::None,
            procedure_necessity: 0.0,
            provider_network: false,
            family_support_indicator: 0.0,
        };

        let low = calculate_lgd(&best, &config());
        let high = calculate_lgd(&worst, &config());

        assert!(low.score >= 0.20);
        assert!(high.score <= 0.70);
        assert!(low.score < high.score);
    }

    #[test]
    fn test_expected_loss_rate_is_exact_product() {
        let pd = calculate_pd(&neutral_scores(), &config());
        let lgd = calculate_lgd(
            &LgdInputs {
                medical_aid_tier: MedicalAidTier::Classic,
                procedure_necessity: 0.6,
                provider_network: true,
                family_support_indicator: 0.5,
            },
            &config(),
        );

        let rate = pd.score * lgd.score;
        assert_eq!(rate, pd.score * lgd.score);
        assert!(rate > 0.0 && rate < 0.15 * 0.70);
    }

    #[test]
    fn test_decision_boundaries() {
        assert_eq!(make_risk_decision(0.009).decision, RiskDecision::Approve);
        assert_eq!(make_risk_decision(0.01).decision, RiskDecision::Approve);
        assert_eq!(make_risk_decision(0.025).decision, RiskDecision::Approve);
        assert_eq!(make_risk_decision(0.0251).decision, RiskDecision::Review);
        assert_eq!(make_risk_decision(0.03).decision, RiskDecision::Review);
        assert_eq!(make_risk_decision(0.05).decision, RiskDecision::Review);
        assert_eq!(make_risk_decision(0.08).decision, RiskDecision::Decline);
    }

    #[test]
    fn test_decision_confidence() {
        assert_eq!(make_risk_decision(0.009).confidence, 0.95);
        assert_eq!(make_risk_decision(0.02).confidence, 0.85);
        assert_eq!(make_risk_decision(0.04).confidence, 0.70);
        assert_eq!(make_risk_decision(0.10).confidence, 0.90);
    }

    #[test]
    fn test_pricing_clamped_to_statutory_band() {
        // Very low risk hits the floor
        assert_eq!(risk_adjusted_pricing(0.0), 0.15);
        // Very high risk hits the cap
        assert_eq!(risk_adjusted_pricing(0.10), 0.28);
        // Mid-range: 0.08 + 2*0.03 + 0.02 + 0.03 = 0.19
        assert!((risk_adjusted_pricing(0.03) - 0.19).abs() < 1e-9);
    }

    #[test]
    fn test_recommended_term() {
        assert_eq!(recommended_term(0.02, 15_000.0), 6);
        assert_eq!(recommended_term(0.02, 8_000.0), 3);
        assert_eq!(recommended_term(0.04, 20_000.0), 4);
        assert_eq!(recommended_term(0.04, 12_000.0), 3);
        assert_eq!(recommended_term(0.10, 50_000.0), 3);
    }

    #[test]
    fn test_max_approved_amount_multipliers() {
        assert_eq!(max_approved_amount(10_000.0, 0.02), 10_000.0);
        assert_eq!(max_approved_amount(10_000.0, 0.04), 8_500.0);
        assert_eq!(max_approved_amount(10_000.0, 0.07), 7_000.0);
        assert_eq!(max_approved_amount(10_000.0, 0.12), 5_000.0);
    }

    #[test]
    fn test_behavioral_score_baseline() {
        // Defaults: 180s (+10), hour 12 (+5), desktop, consistent (+5), 2 edits (+5)
        let score = behavioral_score(&ApplicationBehavior::default());
        assert_eq!(score, 85.0);
    }

    #[test]
    fn test_behavioral_score_penalties() {
        let rushed = ApplicationBehavior {
            completion_time_seconds: 30,
            application_hour: 2,
            device_type: "desktop".to_string(),
            location_consistent: false,
            form_edits_count: 15,
        };
        // 60 - 15 - 10 - 10 - 10 = 15
        assert_eq!(behavioral_score(&rushed), 15.0);
    }

    #[test]
    fn test_behavioral_score_clamped() {
        let best = ApplicationBehavior {
            completion_time_seconds: 200,
            application_hour: 10,
            device_type: "mobile".to_string(),
            location_consistent: true,
            form_edits_count: 2,
        };
        assert_eq!(behavioral_score(&best), 90.0);
    }

    #[test]
    fn test_health_payment_score_blend() {
        let components = HealthComponents {
            medical_aid: 80.0,
            medication_adherence: 70.0,
            provider_payment: 60.0,
            procedure_outcome: 65.0,
            healthcare_utilization: 60.0,
        };
        // 80*.25 + 70*.15 + 60*.30 + 65*.15 + 60*.15 = 67.25 -> 67
        assert_eq!(health_payment_score(&components), 67.0);
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.123456), 0.1235);
        assert_eq!(round4(0.1), 0.1);
        assert_eq!(round4(0.00005), 0.0001);
    }
}
