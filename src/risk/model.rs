//! Risk assessment models and data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Current version of the PD/LGD model
pub const MODEL_VERSION: &str = "v1.0";

// ============================================================================
// Bands and decisions
// ============================================================================

/// Risk decision for an application
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RiskDecision {
    Approve,
    Review,
    Decline,
}

impl RiskDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskDecision::Approve => "approve",
            RiskDecision::Review => "review",
            RiskDecision::Decline => "decline",
        }
    }
}

/// PD band classification
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PdBand {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl PdBand {
    pub fn from_score(pd: f64) -> Self {
        if pd <= 0.02 {
            PdBand::VeryLow
        } else if pd <= 0.05 {
            PdBand::Low
        } else if pd <= 0.10 {
            PdBand::Medium
        } else if pd <= 0.20 {
            PdBand::High
        } else {
            PdBand::VeryHigh
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PdBand::VeryLow => "very_low",
            PdBand::Low => "low",
            PdBand::Medium => "medium",
            PdBand::High => "high",
            PdBand::VeryHigh => "very_high",
        }
    }
}

/// LGD band classification
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LgdBand {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl LgdBand {
    pub fn from_score(lgd: f64) -> Self {
        if lgd <= 0.20 {
            LgdBand::VeryLow
        } else if lgd <= 0.35 {
            LgdBand::Low
        } else if lgd <= 0.50 {
            LgdBand::Medium
        } else if lgd <= 0.70 {
            LgdBand::High
        } else {
            LgdBand::VeryHigh
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LgdBand::VeryLow => "very_low",
            LgdBand::Low => "low",
            LgdBand::Medium => "medium",
            LgdBand::High => "high",
            LgdBand::VeryHigh => "very_high",
        }
    }
}

/// Health payment score band
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthScoreBand {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl HealthScoreBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 80.0 {
            HealthScoreBand::Excellent
        } else if score >= 60.0 {
            HealthScoreBand::Good
        } else if score >= 40.0 {
            HealthScoreBand::Fair
        } else {
            HealthScoreBand::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthScoreBand::Excellent => "excellent",
            HealthScoreBand::Good => "good",
            HealthScoreBand::Fair => "fair",
            HealthScoreBand::Poor => "poor",
        }
    }
}

/// Affordability band classification
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AffordabilityBand {
    High,
    Medium,
    Low,
    Insufficient,
}

impl AffordabilityBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            AffordabilityBand::High => "high",
            AffordabilityBand::Medium => "medium",
            AffordabilityBand::Low => "low",
            AffordabilityBand::Insufficient => "insufficient",
        }
    }
}

/// Medical aid plan tier, derived from scheme/option keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MedicalAidTier {
    None,
    Comprehensive,
    Classic,
    Essential,
    Basic,
}

impl MedicalAidTier {
    pub fn from_plan(scheme: Option<&str>, option: Option<&str>) -> Self {
        if scheme.is_none() {
            return MedicalAidTier::None;
        }

        let option = option.unwrap_or_default().to_lowercase();
        if option.contains("comprehensive") || option.contains("executive") {
            MedicalAidTier::Comprehensive
        } else if option.contains("classic") || option.contains("priority") {
            MedicalAidTier::Classic
        } else if option.contains("essential") || option.contains("smart") {
            MedicalAidTier::Essential
        } else {
            MedicalAidTier::Basic
        }
    }
}

// ============================================================================
// Request DTOs
// ============================================================================

/// Behavioral snapshot captured during the application flow
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApplicationBehavior {
    pub completion_time_seconds: i64,
    pub application_hour: u8,
    pub device_type: String,
    pub location_consistent: bool,
    pub form_edits_count: u32,
}

impl Default for ApplicationBehavior {
    fn default() -> Self {
        Self {
            completion_time_seconds: 180,
            application_hour: 12,
            device_type: "desktop".to_string(),
            location_consistent: true,
            form_edits_count: 2,
        }
    }
}

/// Input contract for a risk assessment
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RiskAssessmentRequest {
    pub user_id: Uuid,
    pub application_id: Uuid,
    #[validate(range(min = 1.0))]
    pub loan_amount: f64,
    #[validate(length(min = 1))]
    pub procedure_type: String,
    pub icd10_code: Option<String>,
    pub provider_id: Option<Uuid>,
    #[validate(range(min = 0.0))]
    pub monthly_income: f64,
    #[validate(range(min = 0.0))]
    pub existing_debt: f64,
    pub medical_aid_scheme: Option<String>,
    pub medical_aid_option: Option<String>,
    #[serde(default)]
    pub has_chronic_conditions: bool,
    #[serde(default)]
    pub application_behavior: Option<ApplicationBehavior>,
}

// ============================================================================
// Computed results
// ============================================================================

/// Weighted PD component contributions (each already multiplied by its weight)
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct PdComponents {
    pub health_score: f64,
    pub procedure_risk: f64,
    pub affordability: f64,
    pub provider: f64,
    pub behavioral: f64,
}

/// Probability-of-default result
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PdResult {
    pub score: f64,
    pub band: PdBand,
    pub components: PdComponents,
}

/// Weighted LGD component contributions
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct LgdComponents {
    pub medical_aid_recovery: f64,
    pub family_support: f64,
    pub procedure_value: f64,
    pub provider_recovery: f64,
}

/// Loss-given-default result
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LgdResult {
    pub score: f64,
    pub band: LgdBand,
    pub components: LgdComponents,
}

/// Expected loss over the exposure
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct ExpectedLoss {
    pub exposure: f64,
    pub amount: f64,
    pub rate: f64,
}

/// Decision with reason and confidence
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DecisionOutcome {
    pub decision: RiskDecision,
    pub reason: String,
    pub confidence: f64,
}

/// Pricing breakdown around the base rate
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct PricingOutcome {
    pub base_rate: f64,
    pub risk_premium: f64,
    pub final_rate: f64,
}

/// Recommended loan terms
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct RecommendedTerms {
    pub recommended_term_months: i32,
    pub max_amount: f64,
}

/// Full assessment returned to callers
#[derive(Debug, Serialize, Clone)]
pub struct RiskAssessmentOutcome {
    pub assessment_id: Uuid,
    pub application_id: Uuid,
    pub pd: PdResult,
    pub lgd: LgdResult,
    pub expected_loss: ExpectedLoss,
    pub decision: DecisionOutcome,
    pub pricing: PricingOutcome,
    pub terms: RecommendedTerms,
    pub health_score: f64,
    pub affordability_band: AffordabilityBand,
    pub model_version: String,
    pub model_confidence: f64,
}

// ============================================================================
// Persisted rows
// ============================================================================

/// Stored risk assessment (immutable once written; re-evaluation inserts a
/// new row)
#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
pub struct StoredRiskAssessment {
    pub assessment_id: Uuid,
    pub application_id: Uuid,
    pub user_id: Uuid,

    pub pd_score: f64,
    pub pd_band: String,
    pub pd_health_score_component: f64,
    pub pd_procedure_risk_component: f64,
    pub pd_affordability_component: f64,
    pub pd_provider_component: f64,
    pub pd_behavioral_component: f64,

    pub lgd_score: f64,
    pub lgd_band: String,
    pub lgd_collateral_component: f64,
    pub lgd_family_support_component: f64,
    pub lgd_procedure_value_component: f64,
    pub lgd_provider_recovery_component: f64,

    pub exposure_at_default: f64,
    pub expected_loss: f64,
    pub expected_loss_rate: f64,

    pub risk_decision: String,
    pub risk_adjusted_pricing: f64,
    pub recommended_term_months: i32,
    pub max_approved_amount: f64,

    pub model_version: String,
    pub model_confidence: f64,
    pub created_at: DateTime<Utc>,
}

/// Patient health payment score, one row per user, refreshed when stale
#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
pub struct PatientHealthScore {
    pub user_id: Uuid,
    pub health_payment_score: f64,
    pub score_band: String,
    pub medical_aid_score: f64,
    pub medication_adherence_score: f64,
    pub provider_payment_score: f64,
    pub procedure_outcome_score: f64,
    pub healthcare_utilization_score: f64,
    pub chronic_conditions_count: i32,
    pub active_medical_aid: bool,
    pub medical_aid_scheme: Option<String>,
    pub medical_aid_option: Option<String>,
    pub family_support_indicator: Option<f64>,
    pub score_calculated_at: DateTime<Utc>,
}

/// Portfolio-level risk aggregates (trailing 30 days)
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PortfolioRiskSummary {
    pub total_assessments: Option<i64>,
    pub avg_pd: Option<f64>,
    pub avg_lgd: Option<f64>,
    pub avg_expected_loss_rate: Option<f64>,
    pub total_exposure: Option<f64>,
    pub total_expected_loss: Option<f64>,
    pub approved_count: Option<i64>,
    pub declined_count: Option<i64>,
    pub review_count: Option<i64>,
}

/// Assessment counts per PD band (trailing 30 days)
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct RiskBandDistribution {
    pub pd_band: String,
    pub count: Option<i64>,
    pub avg_pd: Option<f64>,
    pub avg_el_rate: Option<f64>,
    pub total_exposure: Option<f64>,
}
