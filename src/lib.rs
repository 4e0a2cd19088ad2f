//! Carelend backend library.
//!
//! Core of the healthcare procedure financing platform: the risk assessment
//! engine (PD/LGD/expected loss, decisioning, pricing) and the marketplace
//! auction engine (application submission, lender fan-out, offer collection,
//! single-winner acceptance, repayment schedules).

pub mod audit;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod marketplace;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod risk;
pub mod routes;
pub mod state;
