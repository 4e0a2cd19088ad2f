//! Identity extraction.
//!
//! Authentication is handled upstream by the API gateway, which verifies
//! credentials and forwards the resolved identity as headers. This service
//! never parses credentials itself; it only reads the resolved user id.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use uuid::Uuid;

use crate::error::ApiError;

/// Header carrying the gateway-resolved user id
const USER_ID_HEADER: &str = "x-user-id";

/// Header the gateway sets for admin-scoped identities
const ADMIN_ROLE_HEADER: &str = "x-user-role";

/// Authenticated patient identity resolved by the gateway
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("Missing resolved user identity".to_string()))?;

        let user_id = Uuid::parse_str(user_id)
            .map_err(|_| ApiError::Unauthorized("Invalid user identity".to_string()))?;

        Ok(AuthenticatedUser { user_id })
    }
}

/// Admin identity for lender-dashboard and manual-offer endpoints
#[derive(Debug, Clone, Copy)]
pub struct AdminUser {
    pub user_id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        let role = parts
            .headers
            .get(ADMIN_ROLE_HEADER)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default();

        if !role.eq_ignore_ascii_case("admin") {
            return Err(ApiError::Forbidden("Admin access required".to_string()));
        }

        Ok(AdminUser {
            user_id: user.user_id,
        })
    }
}
