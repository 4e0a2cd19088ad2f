//! Marketplace auction engine.
//!
//! Lenders compete for pre-approved loans. The platform does all
//! underwriting upstream; lenders only decide whether to fund at the
//! calculated terms (or counter with adjusted ones). The engine owns the
//! application/offer/loan lifecycle: submission, lender fan-out, offer
//! collection, single-winner acceptance and repayment schedule generation.

pub mod bridge;
pub mod model;
pub mod service;
pub mod webhook;

pub use bridge::{ApprovalBridge, BridgeSubmission, DemoScoreStrategy, ScoreStrategy};
pub use model::*;
pub use service::MarketplaceService;
