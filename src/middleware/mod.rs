//! Middleware for the API.
//!
//! Request tracing, security headers, and identity extraction. The platform
//! gateway terminates authentication; this service only consumes the
//! resolved user id it forwards.

mod identity;
mod security;
mod tracing;

pub use identity::{AdminUser, AuthenticatedUser};
pub use security::security_headers;
pub use tracing::request_tracing;
