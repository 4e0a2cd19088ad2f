//! Risk assessment API handlers

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::middleware::{AdminUser, AuthenticatedUser};
use crate::models::ApiResponse;
use crate::risk::{
    AffordabilityCalculator, AffordabilityInput, AffordabilityOutcome, PortfolioRiskSummary,
    RiskAssessmentOutcome, RiskAssessmentRequest, RiskBandDistribution, RiskEngine,
    StoredRiskAssessment,
};

/// POST /api/risk/assessments - run a full risk assessment
pub async fn calculate_assessment(
    State(risk_engine): State<Arc<RiskEngine>>,
    _admin: AdminUser,
    Json(request): Json<RiskAssessmentRequest>,
) -> Result<Json<ApiResponse<RiskAssessmentOutcome>>, ApiError> {
    request.validate()?;

    let assessment = risk_engine.calculate_risk_assessment(&request).await?;

    Ok(Json(ApiResponse::ok(assessment)))
}

/// GET /api/risk/assessments/:application_id - fetch the stored assessment
pub async fn get_assessment(
    State(risk_engine): State<Arc<RiskEngine>>,
    _admin: AdminUser,
    Path(application_id): Path<Uuid>,
) -> Result<Json<ApiResponse<StoredRiskAssessment>>, ApiError> {
    let assessment = risk_engine.get_assessment(application_id).await?;

    Ok(Json(ApiResponse::ok(assessment)))
}

/// GET /api/risk/portfolio/summary - 30-day portfolio aggregates
pub async fn portfolio_summary(
    State(risk_engine): State<Arc<RiskEngine>>,
    _admin: AdminUser,
) -> Result<Json<ApiResponse<PortfolioRiskSummary>>, ApiError> {
    let summary = risk_engine.portfolio_summary().await?;

    Ok(Json(ApiResponse::ok(summary)))
}

/// GET /api/risk/portfolio/distribution - assessments by PD band
pub async fn risk_distribution(
    State(risk_engine): State<Arc<RiskEngine>>,
    _admin: AdminUser,
) -> Result<Json<ApiResponse<Vec<RiskBandDistribution>>>, ApiError> {
    let distribution = risk_engine.risk_distribution().await?;

    Ok(Json(ApiResponse::ok(distribution)))
}

/// POST /api/affordability - compute and persist the caller's affordability
pub async fn assess_affordability(
    State(affordability): State<Arc<AffordabilityCalculator>>,
    user: AuthenticatedUser,
    Json(mut input): Json<AffordabilityInput>,
) -> Result<Json<ApiResponse<AffordabilityOutcome>>, ApiError> {
    // Affordability is always assessed for the authenticated user
    input.user_id = user.user_id;
    input.validate()?;

    let outcome = affordability.assess(&input).await?;

    Ok(Json(ApiResponse::ok(outcome)))
}
