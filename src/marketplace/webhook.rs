//! Lender webhook signing and verification.
//!
//! Outbound loan packages and inbound offer responses are both signed with
//! HMAC-SHA256 over the raw JSON body, keyed on the lender's stored API key
//! and hex-encoded in the `X-Carelend-Signature` header.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::marketplace::model::RiskTier;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex-encoded HMAC-SHA256 signature
pub const SIGNATURE_HEADER: &str = "x-carelend-signature";

/// Key used when a lender has no API key configured
pub const DEFAULT_SIGNING_KEY: &str = "default-key";

/// Sign a payload with the lender's API key
pub fn sign_payload(api_key: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(api_key.as_bytes())
        .expect("HMAC-SHA256 accepts keys of any length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a hex-encoded signature against the raw body.
/// Comparison is constant-time.
pub fn verify_signature(api_key: &str, body: &[u8], signature: &str) -> bool {
    let expected = match hex::decode(signature) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = HmacSha256::new_from_slice(api_key.as_bytes())
        .expect("HMAC-SHA256 accepts keys of any length");
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

// ============================================================================
// Outbound loan package
// ============================================================================

/// Pre-approved loan details in the package sent to lenders
#[derive(Debug, Serialize, Clone)]
pub struct PackageLoanTerms {
    pub amount: f64,
    pub proposed_rate: f64,
    pub proposed_term: i32,
    pub proposed_monthly_payment: f64,
}

/// Risk assessment summary in the package (underwriting already done here)
#[derive(Debug, Serialize, Clone)]
pub struct PackageRiskProfile {
    pub score: f64,
    pub tier: RiskTier,
    pub affordability_ratio: f64,
}

/// Anonymized applicant details in the package
#[derive(Debug, Serialize, Clone)]
pub struct PackageApplicant {
    pub monthly_income: Option<f64>,
    pub employment_status: Option<String>,
}

/// Signed JSON payload POSTed to an external lender's webhook endpoint
#[derive(Debug, Serialize, Clone)]
pub struct LoanPackagePayload {
    pub event: &'static str,
    pub application_id: Uuid,
    pub loan: PackageLoanTerms,
    pub risk: PackageRiskProfile,
    pub applicant: PackageApplicant,
    pub action_required: &'static str,
    pub respond_by: DateTime<Utc>,
    pub callback_url: String,
}

// ============================================================================
// Inbound offer response
// ============================================================================

/// Body of a lender's webhook callback
#[derive(Debug, Deserialize)]
pub struct WebhookOfferResponse {
    pub application_id: Uuid,
    pub lender_code: String,
    /// "ACCEPT" or "DECLINE"
    pub decision: String,
    pub adjusted_rate: Option<f64>,
    pub adjusted_term: Option<i32>,
    pub decline_reason: Option<String>,
    pub lender_notes: Option<String>,
    pub conditions: Option<String>,
}
