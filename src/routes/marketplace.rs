//! Marketplace route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::marketplace::{
    accept_offer, get_application, get_application_offers, get_loan_repayments,
    list_applications, list_lenders, list_loans, manual_offer, pending_applications,
    submit_application, webhook_offer_response,
};
use crate::state::AppState;

pub fn marketplace_routes() -> Router<AppState> {
    Router::new()
        // Patient endpoints
        .route(
            "/api/marketplace/applications",
            post(submit_application).get(list_applications),
        )
        .route("/api/marketplace/applications/:id", get(get_application))
        .route(
            "/api/marketplace/applications/:id/offers",
            get(get_application_offers),
        )
        .route("/api/marketplace/offers/:id/accept", post(accept_offer))
        .route("/api/marketplace/loans", get(list_loans))
        .route(
            "/api/marketplace/loans/:id/repayments",
            get(get_loan_repayments),
        )
        // Lender webhook
        .route(
            "/api/marketplace/webhooks/offer-response",
            post(webhook_offer_response),
        )
        // Admin / lender dashboard
        .route("/api/marketplace/admin/manual-offers", post(manual_offer))
        .route(
            "/api/marketplace/admin/pending-applications",
            get(pending_applications),
        )
        .route("/api/marketplace/admin/lenders", get(list_lenders))
}
