//! Marketplace API handlers

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::marketplace::webhook::{self, WebhookOfferResponse, SIGNATURE_HEADER};
use crate::marketplace::{
    AcceptedLoan, ApplicationSummary, ApprovalBridge, BridgeSubmission, Lender,
    LenderResponseOutcome, LenderResponseParams, LoanApplication, LoanRepayment, LoanSummary,
    MarketplaceService, OfferWithLender, PendingApplication,
};
use crate::marketplace::model::MarketplaceApplicationRequest;
use crate::middleware::{AdminUser, AuthenticatedUser};
use crate::models::ApiResponse;
use crate::state::AppState;

/// Response for a successful submission
#[derive(Debug, Serialize)]
pub struct SubmissionResponse {
    pub application_id: Uuid,
}

/// Application detail with its offers
#[derive(Debug, Serialize)]
pub struct ApplicationWithOffers {
    #[serde(flatten)]
    pub application: LoanApplication,
    pub offers: Vec<OfferWithLender>,
}

/// POST /api/marketplace/applications - submit a loan application
pub async fn submit_application(
    State(bridge): State<Arc<ApprovalBridge>>,
    user: AuthenticatedUser,
    headers: HeaderMap,
    Json(request): Json<MarketplaceApplicationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SubmissionResponse>>), ApiError> {
    request.validate()?;

    let ip_address = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string());
    let user_agent = headers
        .get("user-agent")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    let application_id = bridge
        .send_to_marketplace(BridgeSubmission {
            user_id: user.user_id,
            provider_id: request.provider_id,
            procedure_type: request.procedure_type,
            procedure_code: request.procedure_code,
            procedure_description: request.procedure_description,
            loan_amount: request.loan_amount,
            requested_term: request.requested_term,
            existing_monthly_income: request.monthly_income,
            existing_employment_status: request.employment_status,
            existing_employment_duration_months: request.employment_duration_months,
            ip_address,
            user_agent,
            ..Default::default()
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::ok_with_message(
            SubmissionResponse { application_id },
            "Application submitted to marketplace",
        )),
    ))
}

/// GET /api/marketplace/applications - the caller's applications
pub async fn list_applications(
    State(marketplace): State<Arc<MarketplaceService>>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<ApplicationSummary>>>, ApiError> {
    let applications = marketplace.list_user_applications(user.user_id).await?;

    Ok(Json(ApiResponse::ok(applications)))
}

/// GET /api/marketplace/applications/:id - one application with offers
pub async fn get_application(
    State(marketplace): State<Arc<MarketplaceService>>,
    user: AuthenticatedUser,
    Path(application_id): Path<Uuid>,
) -> Result<Json<ApiResponse<ApplicationWithOffers>>, ApiError> {
    let application = marketplace
        .application_for_user(application_id, user.user_id)
        .await?;
    let offers = marketplace.get_application_offers(application_id).await?;

    Ok(Json(ApiResponse::ok(ApplicationWithOffers {
        application,
        offers,
    })))
}

/// GET /api/marketplace/applications/:id/offers - offers for an application
pub async fn get_application_offers(
    State(marketplace): State<Arc<MarketplaceService>>,
    user: AuthenticatedUser,
    Path(application_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<OfferWithLender>>>, ApiError> {
    // Ownership check before exposing offers
    marketplace
        .application_for_user(application_id, user.user_id)
        .await?;

    let offers = marketplace.get_application_offers(application_id).await?;

    Ok(Json(ApiResponse::ok(offers)))
}

/// POST /api/marketplace/offers/:id/accept - accept one offer
pub async fn accept_offer(
    State(marketplace): State<Arc<MarketplaceService>>,
    user: AuthenticatedUser,
    Path(offer_id): Path<Uuid>,
) -> Result<Json<ApiResponse<AcceptedLoan>>, ApiError> {
    let accepted = marketplace.accept_offer(offer_id, user.user_id).await?;

    Ok(Json(ApiResponse::ok_with_message(
        accepted,
        "Offer accepted! Your loan is being processed.",
    )))
}

/// GET /api/marketplace/loans - the caller's funded loans
pub async fn list_loans(
    State(marketplace): State<Arc<MarketplaceService>>,
    user: AuthenticatedUser,
) -> Result<Json<ApiResponse<Vec<LoanSummary>>>, ApiError> {
    let loans = marketplace.list_user_loans(user.user_id).await?;

    Ok(Json(ApiResponse::ok(loans)))
}

/// GET /api/marketplace/loans/:id/repayments - repayment schedule
pub async fn get_loan_repayments(
    State(marketplace): State<Arc<MarketplaceService>>,
    user: AuthenticatedUser,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<LoanRepayment>>>, ApiError> {
    let repayments = marketplace.loan_repayments(loan_id, user.user_id).await?;

    Ok(Json(ApiResponse::ok(repayments)))
}

/// POST /api/marketplace/webhooks/offer-response - signed lender callback.
///
/// The signature is HMAC-SHA256 over the raw body with the lender's API key.
/// Production rejects invalid or missing signatures; other environments
/// accept them with a loud warning so sandbox lenders can integrate before
/// exchanging keys. That bypass is a known gap, not a guarantee.
pub async fn webhook_offer_response(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<LenderResponseOutcome>>, ApiError> {
    let response: WebhookOfferResponse = serde_json::from_slice(&body)?;

    if response.decision != "ACCEPT" && response.decision != "DECLINE" {
        return Err(ApiError::ValidationError(
            "Decision must be ACCEPT or DECLINE".to_string(),
        ));
    }

    let lender = state
        .marketplace
        .lender_by_code(&response.lender_code)
        .await?
        .filter(|l| l.active)
        .ok_or_else(|| ApiError::Unauthorized("Unknown lender".to_string()))?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or_default();

    let api_key = lender
        .api_key
        .as_deref()
        .unwrap_or(webhook::DEFAULT_SIGNING_KEY);
    let signature_valid = !signature.is_empty() && webhook::verify_signature(api_key, &body, signature);

    if !signature_valid {
        if state.environment.is_production() {
            return Err(ApiError::Unauthorized("Invalid signature".to_string()));
        }
        // Security gap carried from the integration sandbox: outside
        // production an unverified webhook is still processed
        tracing::warn!(
            lender = %lender.code,
            environment = %state.environment.as_str(),
            "Webhook signature verification bypassed outside production"
        );
    }

    let outcome = state
        .marketplace
        .receive_lender_offer(LenderResponseParams {
            application_id: response.application_id,
            lender_code: response.lender_code,
            accepted: response.decision == "ACCEPT",
            adjusted_rate: response.adjusted_rate,
            adjusted_term: response.adjusted_term,
            reason: response.decline_reason,
            lender_notes: response.lender_notes,
            conditions: response.conditions,
        })
        .await?;

    Ok(Json(ApiResponse::ok_with_message(
        outcome,
        if outcome.declined {
            "Decline recorded"
        } else {
            "Offer recorded"
        },
    )))
}

/// POST /api/marketplace/admin/manual-offers - manual lender response entry
pub async fn manual_offer(
    State(marketplace): State<Arc<MarketplaceService>>,
    _admin: AdminUser,
    Json(params): Json<LenderResponseParams>,
) -> Result<Json<ApiResponse<LenderResponseOutcome>>, ApiError> {
    let outcome = marketplace.receive_lender_offer(params).await?;

    Ok(Json(ApiResponse::ok_with_message(
        outcome,
        if outcome.declined {
            "Decline recorded"
        } else {
            "Offer created"
        },
    )))
}

/// GET /api/marketplace/admin/pending-applications - lender dashboard feed
pub async fn pending_applications(
    State(marketplace): State<Arc<MarketplaceService>>,
    _admin: AdminUser,
) -> Result<Json<ApiResponse<Vec<PendingApplication>>>, ApiError> {
    let applications = marketplace.pending_applications().await?;

    Ok(Json(ApiResponse::ok(applications)))
}

/// GET /api/marketplace/admin/lenders - lender directory
pub async fn list_lenders(
    State(marketplace): State<Arc<MarketplaceService>>,
    _admin: AdminUser,
) -> Result<Json<ApiResponse<Vec<Lender>>>, ApiError> {
    let lenders = marketplace.list_lenders().await?;

    Ok(Json(ApiResponse::ok(lenders)))
}
