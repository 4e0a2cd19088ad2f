//! Risk assessment route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::risk::{
    assess_affordability, calculate_assessment, get_assessment, portfolio_summary,
    risk_distribution,
};
use crate::state::AppState;

pub fn risk_routes() -> Router<AppState> {
    Router::new()
        .route("/api/risk/assessments", post(calculate_assessment))
        .route("/api/risk/assessments/:application_id", get(get_assessment))
        .route("/api/risk/portfolio/summary", get(portfolio_summary))
        .route("/api/risk/portfolio/distribution", get(risk_distribution))
        .route("/api/affordability", post(assess_affordability))
}
