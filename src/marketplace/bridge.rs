//! Approval bridge.
//!
//! Connects upstream loan approval (however it happened) to the marketplace
//! submission contract. Pure translation: missing underwriting fields are
//! filled with documented defaults and the result is forwarded; the bridge
//! holds no state of its own.

use std::sync::Arc;

use rand::Rng;
use uuid::Uuid;

use crate::error::ApiError;
use crate::marketplace::model::SubmitApplicationParams;
use crate::marketplace::service::{calculate_monthly_payment, MarketplaceService};

/// Base rate the default pricing tiers build on
const DEFAULT_BASE_RATE: f64 = 0.18;

/// Fallback score strategy: given identifying inputs, return a 0-100 risk
/// score. A real bureau integration replaces this without touching the
/// bridge or the auction engine.
pub trait ScoreStrategy: Send + Sync {
    fn risk_score(&self) -> f64;
}

/// Last-resort placeholder scoring: uniform in [50, 80].
/// Explicitly a demo stand-in for a real scoring integration.
pub struct DemoScoreStrategy;

impl ScoreStrategy for DemoScoreStrategy {
    fn risk_score(&self) -> f64 {
        rand::thread_rng().gen_range(50..=80) as f64
    }
}

/// Default annual rate by risk bucket: 20% / 23% / 28%
pub fn default_rate(risk_score: f64) -> f64 {
    if risk_score >= 70.0 {
        DEFAULT_BASE_RATE + 0.02
    } else if risk_score >= 40.0 {
        DEFAULT_BASE_RATE + 0.05
    } else {
        DEFAULT_BASE_RATE + 0.10
    }
}

/// Application data handed over from upstream approval.
/// `existing_*` fields carry that flow's underwriting results when it has
/// them; anything absent gets a documented default.
#[derive(Debug, Clone, Default)]
pub struct BridgeSubmission {
    pub user_id: Uuid,
    pub provider_id: Option<Uuid>,
    pub procedure_type: String,
    pub procedure_code: Option<String>,
    pub procedure_description: Option<String>,
    pub loan_amount: f64,
    pub requested_term: i32,

    pub existing_risk_score: Option<f64>,
    pub existing_affordability_score: Option<f64>,
    pub existing_debt_to_income_ratio: Option<f64>,
    pub existing_monthly_income: Option<f64>,
    pub existing_employment_status: Option<String>,
    pub existing_employment_duration_months: Option<i32>,
    pub existing_recommended_rate: Option<f64>,
    pub existing_recommended_term: Option<i32>,
    pub existing_monthly_payment: Option<f64>,

    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Bridge from upstream approval into the marketplace
pub struct ApprovalBridge {
    marketplace: Arc<MarketplaceService>,
    score_strategy: Arc<dyn ScoreStrategy>,
}

impl ApprovalBridge {
    pub fn new(marketplace: Arc<MarketplaceService>, score_strategy: Arc<dyn ScoreStrategy>) -> Self {
        Self {
            marketplace,
            score_strategy,
        }
    }

    /// Translate an approved loan into the submission contract and forward
    /// it to the marketplace
    pub async fn send_to_marketplace(
        &self,
        submission: BridgeSubmission,
    ) -> Result<Uuid, ApiError> {
        let risk_score = submission
            .existing_risk_score
            .unwrap_or_else(|| self.score_strategy.risk_score());
        let affordability_score = submission.existing_affordability_score.unwrap_or(60.0);
        let monthly_income = submission.existing_monthly_income.unwrap_or(0.0);
        let employment_status = submission
            .existing_employment_status
            .unwrap_or_else(|| "UNKNOWN".to_string());
        let recommended_rate = submission
            .existing_recommended_rate
            .unwrap_or_else(|| default_rate(risk_score));
        let recommended_term = submission
            .existing_recommended_term
            .unwrap_or(submission.requested_term);
        let monthly_payment = submission.existing_monthly_payment.unwrap_or_else(|| {
            calculate_monthly_payment(submission.loan_amount, recommended_rate, recommended_term)
        });

        self.marketplace
            .submit_to_marketplace(SubmitApplicationParams {
                user_id: submission.user_id,
                provider_id: submission.provider_id,
                procedure_type: submission.procedure_type,
                procedure_code: submission.procedure_code,
                procedure_description: submission.procedure_description,
                loan_amount: submission.loan_amount,
                requested_term: submission.requested_term,

                risk_score: Some(risk_score),
                affordability_score: Some(affordability_score),
                debt_to_income_ratio: submission.existing_debt_to_income_ratio,
                monthly_income: Some(monthly_income),
                employment_status: Some(employment_status),
                employment_duration_months: submission.existing_employment_duration_months,

                recommended_rate: Some(recommended_rate),
                recommended_term: Some(recommended_term),
                recommended_monthly_payment: Some(monthly_payment),

                ip_address: submission.ip_address,
                user_agent: submission.user_agent,
            })
            .await
    }

    /// Minimal-field convenience submission
    pub async fn quick_submit(
        &self,
        user_id: Uuid,
        provider_id: Option<Uuid>,
        procedure_type: &str,
        loan_amount: f64,
        requested_term: i32,
    ) -> Result<Uuid, ApiError> {
        self.send_to_marketplace(BridgeSubmission {
            user_id,
            provider_id,
            procedure_type: procedure_type.to_string(),
            loan_amount,
            requested_term,
            ..Default::default()
        })
        .await
    }
}
