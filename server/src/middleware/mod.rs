pub mod bearer_auth;
pub mod hmac_auth;
pub mod rate_limit;
pub mod request_id;

pub use bearer_auth::BearerAuth;
pub use hmac_auth::HmacAuth;
pub use rate_limit::RateLimit;
pub use request_id::RequestIdMiddleware;

use actix_web::{HttpMessage, HttpRequest};
use uuid::Uuid;

use crate::error::ApiError;

/// Authenticated merchant identity, inserted into request extensions by
/// `HmacAuth` (API path) or `BearerAuth` (dashboard path).
#[derive(Debug, Clone)]
pub struct MerchantContext {
    pub merchant_id: Uuid,
    pub access_key: String,
    /// Request signature on the HMAC path; absent for bearer sessions.
    pub signature: Option<String>,
}

/// Fetch the authenticated merchant from request extensions.
pub fn merchant_context(req: &HttpRequest) -> Result<MerchantContext, ApiError> {
    req.extensions()
        .get::<MerchantContext>()
        .cloned()
        .ok_or(ApiError::InvalidToken)
}

/// Best-effort client IP for the transaction record.
pub fn client_ip(req: &HttpRequest) -> String {
    req.connection_info()
        .realip_remote_addr()
        .unwrap_or("")
        .to_string()
}
