//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::PgPool;

use crate::config::Environment;
use crate::marketplace::{ApprovalBridge, MarketplaceService};
use crate::risk::{AffordabilityCalculator, RiskEngine};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub environment: Environment,
    pub risk_engine: Arc<RiskEngine>,
    pub affordability: Arc<AffordabilityCalculator>,
    pub marketplace: Arc<MarketplaceService>,
    pub bridge: Arc<ApprovalBridge>,
}

impl AppState {
    pub fn new(
        db_pool: PgPool,
        environment: Environment,
        risk_engine: Arc<RiskEngine>,
        affordability: Arc<AffordabilityCalculator>,
        marketplace: Arc<MarketplaceService>,
        bridge: Arc<ApprovalBridge>,
    ) -> Self {
        Self {
            db_pool,
            environment,
            risk_engine,
            affordability,
            marketplace,
            bridge,
        }
    }
}

impl FromRef<AppState> for PgPool {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.db_pool.clone()
    }
}

impl FromRef<AppState> for Environment {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.environment
    }
}

impl FromRef<AppState> for Arc<RiskEngine> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.risk_engine.clone()
    }
}

impl FromRef<AppState> for Arc<AffordabilityCalculator> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.affordability.clone()
    }
}

impl FromRef<AppState> for Arc<MarketplaceService> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.marketplace.clone()
    }
}

impl FromRef<AppState> for Arc<ApprovalBridge> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.bridge.clone()
    }
}
