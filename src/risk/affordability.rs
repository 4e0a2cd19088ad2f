//! Healthcare affordability calculator.
//!
//! Debt-service capacity specific to medical financing: the DTI includes the
//! medical aid premium, and only 30% of disposable income is treated as
//! available for healthcare repayments. Independently queryable; the risk
//! engine also consumes it as a PD component.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::risk::model::AffordabilityBand;

/// Share of disposable income assumed available for healthcare repayments
const HEALTHCARE_CAPACITY_RATIO: f64 = 0.30;

/// Term assumed when translating capacity into a max loan amount (months)
const ASSUMED_TERM_MONTHS: f64 = 3.0;

/// Haircut applied to the max loan amount to leave room for interest
const INTEREST_BUFFER: f64 = 0.85;

/// Inputs to an affordability assessment
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AffordabilityInput {
    /// Overwritten with the authenticated user by the HTTP layer
    #[serde(default = "Uuid::new_v4")]
    pub user_id: Uuid,
    #[validate(range(min = 0.0))]
    pub monthly_income: f64,
    #[validate(range(min = 0.0))]
    pub existing_debt: f64,
    #[validate(range(min = 1.0))]
    pub loan_amount: f64,
    #[serde(default)]
    pub medical_aid_premium: f64,
}

/// Computed affordability snapshot
#[derive(Debug, Clone, Serialize)]
pub struct AffordabilityOutcome {
    pub healthcare_dti: f64,
    pub disposable_income: f64,
    pub healthcare_capacity: f64,
    pub affordability_band: AffordabilityBand,
    pub affordability_score: f64,
    pub max_monthly_payment: f64,
    pub max_loan_amount: f64,
}

/// Affordability assessment service
#[derive(Clone)]
pub struct AffordabilityCalculator {
    pool: PgPool,
}

impl AffordabilityCalculator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Pure affordability computation
    pub fn evaluate(input: &AffordabilityInput) -> AffordabilityOutcome {
        let income = input.monthly_income;
        let debt = input.existing_debt;
        let premium = input.medical_aid_premium;

        // Zero income signals maximum risk rather than dividing by zero
        let healthcare_dti = if income > 0.0 {
            (debt + premium) / income
        } else {
            1.0
        };

        let disposable_income = income - debt - premium;
        let healthcare_capacity = (disposable_income * HEALTHCARE_CAPACITY_RATIO).max(0.0);
        let max_monthly_payment = healthcare_capacity;
        let max_loan_amount = max_monthly_payment * ASSUMED_TERM_MONTHS * INTEREST_BUFFER;

        let requested_monthly_payment = input.loan_amount / ASSUMED_TERM_MONTHS;
        let (affordability_band, affordability_score) =
            if requested_monthly_payment <= healthcare_capacity * 0.5 {
                (AffordabilityBand::High, 85.0)
            } else if requested_monthly_payment <= healthcare_capacity * 0.75 {
                (AffordabilityBand::Medium, 65.0)
            } else if requested_monthly_payment <= healthcare_capacity {
                (AffordabilityBand::Low, 45.0)
            } else {
                (AffordabilityBand::Insufficient, 20.0)
            };

        AffordabilityOutcome {
            healthcare_dti,
            disposable_income,
            healthcare_capacity,
            affordability_band,
            affordability_score,
            max_monthly_payment,
            max_loan_amount,
        }
    }

    /// Compute and persist the user's affordability snapshot.
    /// One row per user; each assessment replaces the previous values.
    pub async fn assess(&self, input: &AffordabilityInput) -> Result<AffordabilityOutcome, ApiError> {
        let outcome = Self::evaluate(input);

        sqlx::query(
            r#"
            INSERT INTO healthcare_affordability (
                user_id, declared_income, monthly_debt_obligations, medical_aid_premium,
                healthcare_dti, disposable_income, healthcare_capacity,
                affordability_band, max_monthly_payment, max_loan_amount, assessed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
            ON CONFLICT (user_id)
            DO UPDATE SET
                declared_income = EXCLUDED.declared_income,
                monthly_debt_obligations = EXCLUDED.monthly_debt_obligations,
                medical_aid_premium = EXCLUDED.medical_aid_premium,
                healthcare_dti = EXCLUDED.healthcare_dti,
                disposable_income = EXCLUDED.disposable_income,
                healthcare_capacity = EXCLUDED.healthcare_capacity,
                affordability_band = EXCLUDED.affordability_band,
                max_monthly_payment = EXCLUDED.max_monthly_payment,
                max_loan_amount = EXCLUDED.max_loan_amount,
                assessed_at = NOW()
            "#,
        )
        .bind(input.user_id)
        .bind(input.monthly_income)
        .bind(input.existing_debt)
        .bind(input.medical_aid_premium)
        .bind(outcome.healthcare_dti)
        .bind(outcome.disposable_income)
        .bind(outcome.healthcare_capacity)
        .bind(outcome.affordability_band.as_str())
        .bind(outcome.max_monthly_payment)
        .bind(outcome.max_loan_amount)
        .execute(&self.pool)
        .await?;

        Ok(outcome)
    }

    /// Rough monthly premium estimate by plan option keyword
    pub fn estimate_medical_aid_premium(option: Option<&str>) -> f64 {
        let estimates: [(&str, f64); 5] = [
            ("comprehensive", 4_500.0),
            ("classic", 3_000.0),
            ("essential", 2_000.0),
            ("smart", 1_500.0),
            ("basic", 1_000.0),
        ];

        let option = option.unwrap_or("essential").to_lowercase();
        for (tier, premium) in estimates {
            if option.contains(tier) {
                return premium;
            }
        }
        2_000.0
    }
}
