//! Marketplace models and data structures.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Loan amount bounds accepted by the marketplace
pub const MIN_LOAN_AMOUNT: f64 = 1_000.0;
pub const MAX_LOAN_AMOUNT: f64 = 500_000.0;

/// Term bounds in months
pub const MIN_TERM_MONTHS: i32 = 3;
pub const MAX_TERM_MONTHS: i32 = 60;

/// Origination fee charged on disbursement, as a fraction of principal
pub const ORIGINATION_FEE_RATE: f64 = 0.025;

/// How long lenders have to respond after submission
pub const OFFER_COLLECTION_WINDOW_HOURS: i64 = 2;

/// How long an individual offer stays open
pub const OFFER_EXPIRY_HOURS: i64 = 24;

// ============================================================================
// Status enums
// ============================================================================

/// Loan application lifecycle.
///
/// Applications that never receive an offer stay in UNDERWRITING or
/// OFFERS_RECEIVED past their deadline; an external sweep fails them.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "application_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Submitted,
    Underwriting,
    OffersReceived,
    OfferSelected,
}

/// Lender offer lifecycle
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "offer_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

/// Marketplace loan lifecycle
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "loan_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    PendingDisbursement,
    Active,
    Completed,
    Defaulted,
}

/// Scheduled repayment lifecycle
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "repayment_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepaymentStatus {
    Scheduled,
    Completed,
    Overdue,
    Failed,
}

/// Lender funding model.
///
/// The platform's own balance sheet funds loans without a network round
/// trip; external lenders are notified and respond via webhook or manual
/// entry.
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "lender_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LenderType {
    External,
    CarelendBalanceSheet,
}

/// Coarse risk bucket used for lender matching and premium lookup
#[derive(Debug, Serialize, Deserialize, sqlx::Type, Clone, Copy, PartialEq, Eq)]
#[sqlx(type_name = "risk_tier", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Tier from a 0-100 risk score; missing scores land in the middle
    pub fn from_score(score: Option<f64>) -> Self {
        match score {
            None => RiskTier::Medium,
            Some(s) if s >= 70.0 => RiskTier::Low,
            Some(s) if s >= 40.0 => RiskTier::Medium,
            Some(_) => RiskTier::High,
        }
    }
}

// ============================================================================
// Persisted rows
// ============================================================================

/// Lender directory entry with eligibility criteria and pricing
#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
pub struct Lender {
    pub lender_id: Uuid,
    pub name: String,
    pub code: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub lender_type: LenderType,
    pub active: bool,
    pub min_loan_amount: f64,
    pub max_loan_amount: f64,
    pub min_risk_score: f64,
    pub max_risk_score: f64,
    pub base_rate: f64,
    pub risk_premium_low: Option<f64>,
    pub risk_premium_mid: Option<f64>,
    pub risk_premium_high: Option<f64>,
    pub webhook_url: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub contact_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Marketplace loan application with pre-approved terms.
/// The auction never re-derives risk; it consumes what underwriting computed.
#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
pub struct LoanApplication {
    pub application_id: Uuid,
    pub user_id: Uuid,
    pub provider_id: Option<Uuid>,
    pub procedure_type: String,
    pub procedure_code: Option<String>,
    pub procedure_description: Option<String>,
    pub loan_amount: f64,
    pub requested_term: i32,

    pub risk_score: Option<f64>,
    pub risk_tier: RiskTier,
    pub affordability_score: Option<f64>,
    pub debt_to_income_ratio: Option<f64>,
    pub monthly_income: Option<f64>,
    pub employment_status: Option<String>,
    pub employment_duration_months: Option<i32>,

    pub recommended_rate: Option<f64>,
    pub recommended_term: Option<i32>,
    pub recommended_monthly_payment: Option<f64>,

    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    pub offers_deadline: DateTime<Utc>,
    pub underwriting_completed_at: Option<DateTime<Utc>>,
    pub decision_at: Option<DateTime<Utc>>,
    pub selected_offer_id: Option<Uuid>,

    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lender offer, unique per (application, lender)
#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
pub struct LenderOffer {
    pub offer_id: Uuid,
    pub application_id: Uuid,
    pub lender_id: Uuid,
    pub approved_amount: f64,
    pub interest_rate: f64,
    pub term: i32,
    pub monthly_payment: f64,
    pub total_repayable: f64,
    pub origination_fee: f64,
    pub status: OfferStatus,
    pub expires_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub decline_reason: Option<String>,
    pub lender_notes: Option<String>,
    pub conditions: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Offer joined with its lender's public details
#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
pub struct OfferWithLender {
    pub offer_id: Uuid,
    pub application_id: Uuid,
    pub lender_id: Uuid,
    pub approved_amount: f64,
    pub interest_rate: f64,
    pub term: i32,
    pub monthly_payment: f64,
    pub total_repayable: f64,
    pub origination_fee: f64,
    pub status: OfferStatus,
    pub expires_at: DateTime<Utc>,
    pub lender_notes: Option<String>,
    pub conditions: Option<String>,
    pub lender_name: String,
    pub lender_code: String,
    pub lender_type: LenderType,
}

/// Funded marketplace loan, created exactly once per application
#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
pub struct MarketplaceLoan {
    pub loan_id: Uuid,
    pub application_id: Uuid,
    pub offer_id: Uuid,
    pub lender_id: Uuid,
    pub user_id: Uuid,
    pub provider_id: Option<Uuid>,
    pub principal_amount: f64,
    pub interest_rate: f64,
    pub term: i32,
    pub monthly_payment: f64,
    pub total_repayable: f64,
    pub origination_fee: f64,
    pub total_fees: f64,
    pub status: LoanStatus,
    pub outstanding_principal: f64,
    pub total_outstanding: f64,
    pub first_payment_date: NaiveDate,
    pub maturity_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One scheduled repayment of a marketplace loan
#[derive(Debug, Serialize, sqlx::FromRow, Clone)]
pub struct LoanRepayment {
    pub repayment_id: Uuid,
    pub loan_id: Uuid,
    pub user_id: Uuid,
    pub payment_number: i32,
    pub scheduled_date: NaiveDate,
    pub scheduled_amount: f64,
    pub principal_portion: f64,
    pub interest_portion: f64,
    pub status: RepaymentStatus,
    pub paid_date: Option<NaiveDate>,
}

/// Application summary for the applicant's dashboard
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ApplicationSummary {
    pub application_id: Uuid,
    pub procedure_type: String,
    pub loan_amount: f64,
    pub requested_term: i32,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    pub offers_deadline: DateTime<Utc>,
    pub pending_offers: Option<i64>,
    pub best_rate: Option<f64>,
}

/// Application row for the lender/admin dashboard
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct PendingApplication {
    pub application_id: Uuid,
    pub procedure_type: String,
    pub loan_amount: f64,
    pub requested_term: i32,
    pub risk_score: Option<f64>,
    pub risk_tier: RiskTier,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    pub offers_deadline: DateTime<Utc>,
    pub offer_count: Option<i64>,
}

/// Loan summary for the borrower's dashboard
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct LoanSummary {
    pub loan_id: Uuid,
    pub application_id: Uuid,
    pub principal_amount: f64,
    pub interest_rate: f64,
    pub term: i32,
    pub monthly_payment: f64,
    pub status: LoanStatus,
    pub outstanding_principal: f64,
    pub first_payment_date: NaiveDate,
    pub maturity_date: NaiveDate,
    pub lender_name: String,
    pub completed_payments: Option<i64>,
}

// ============================================================================
// Operation inputs and outputs
// ============================================================================

/// Full submission contract handed to the auction engine.
/// All underwriting results are pre-computed by the caller.
#[derive(Debug, Clone)]
pub struct SubmitApplicationParams {
    pub user_id: Uuid,
    pub provider_id: Option<Uuid>,
    pub procedure_type: String,
    pub procedure_code: Option<String>,
    pub procedure_description: Option<String>,
    pub loan_amount: f64,
    pub requested_term: i32,

    pub risk_score: Option<f64>,
    pub affordability_score: Option<f64>,
    pub debt_to_income_ratio: Option<f64>,
    pub monthly_income: Option<f64>,
    pub employment_status: Option<String>,
    pub employment_duration_months: Option<i32>,

    pub recommended_rate: Option<f64>,
    pub recommended_term: Option<i32>,
    pub recommended_monthly_payment: Option<f64>,

    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// A lender's response to a loan package (webhook or manual entry)
#[derive(Debug, Clone, Deserialize)]
pub struct LenderResponseParams {
    pub application_id: Uuid,
    pub lender_code: String,
    pub accepted: bool,
    pub adjusted_rate: Option<f64>,
    pub adjusted_term: Option<i32>,
    pub reason: Option<String>,
    pub lender_notes: Option<String>,
    pub conditions: Option<String>,
}

/// Outcome of processing a lender response
#[derive(Debug, Serialize, Clone, Copy)]
pub struct LenderResponseOutcome {
    pub success: bool,
    pub declined: bool,
}

/// Result of accepting an offer
#[derive(Debug, Serialize, Clone, Copy)]
pub struct AcceptedLoan {
    pub loan_id: Uuid,
    pub offer_id: Uuid,
    pub application_id: Uuid,
}

/// HTTP request body for submitting an application to the marketplace
#[derive(Debug, Deserialize, Validate)]
pub struct MarketplaceApplicationRequest {
    pub provider_id: Option<Uuid>,
    #[validate(length(min = 1, message = "procedureType is required"))]
    pub procedure_type: String,
    pub procedure_code: Option<String>,
    pub procedure_description: Option<String>,
    #[validate(range(
        min = 1000.0,
        max = 500000.0,
        message = "Loan amount must be between 1,000 and 500,000"
    ))]
    pub loan_amount: f64,
    #[validate(range(min = 3, max = 60, message = "Loan term must be between 3 and 60 months"))]
    pub requested_term: i32,
    pub monthly_income: Option<f64>,
    pub employment_status: Option<String>,
    pub employment_duration_months: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_tier_from_score() {
        assert_eq!(RiskTier::from_score(Some(85.0)), RiskTier::Low);
        assert_eq!(RiskTier::from_score(Some(70.0)), RiskTier::Low);
        assert_eq!(RiskTier::from_score(Some(69.9)), RiskTier::Medium);
        assert_eq!(RiskTier::from_score(Some(40.0)), RiskTier::Medium);
        assert_eq!(RiskTier::from_score(Some(39.9)), RiskTier::High);
        assert_eq!(RiskTier::from_score(Some(0.0)), RiskTier::High);
    }

    #[test]
    fn test_missing_risk_score_defaults_to_medium() {
        assert_eq!(RiskTier::from_score(None), RiskTier::Medium);
    }
}
