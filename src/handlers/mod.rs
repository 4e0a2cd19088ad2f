//! API handlers.
//!
//! Thin layer between routes and services: extract, validate, delegate,
//! wrap in the response envelope.

pub mod marketplace;
pub mod risk;
