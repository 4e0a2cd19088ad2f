//! Route definitions for the API

mod marketplace;
mod risk;

pub use marketplace::marketplace_routes;
pub use risk::risk_routes;
