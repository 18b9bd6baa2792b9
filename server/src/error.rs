//! Error taxonomy for the gateway.
//!
//! Every failure a caller can observe maps to a stable short code plus a
//! human message. Internal causes ride along for logging but are never
//! serialized into a response.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use gateway_crypto_core::CryptoError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    // -- Authenticity pipeline --
    #[error("Invalid access key")]
    InvalidAccessKey,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Request timestamp expired")]
    TimestampExpired,
    #[error("Nonce has already been used")]
    NonceUsed,

    // -- Ledger --
    #[error("Insufficient balance in wallet")]
    InsufficientFunds,
    #[error("Invalid amount")]
    InvalidAmount,
    #[error("{0}")]
    Validation(String),
    #[error("Duplicate transaction")]
    DuplicateTransaction,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Original transaction not eligible for refund")]
    InvalidRefund,
    #[error("Refund amount exceeds original transaction amount")]
    RefundAmountExceedsOriginal,

    // -- Dashboard auth --
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Username already exists")]
    UsernameExists,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Merchant account is suspended")]
    MerchantSuspended,

    // -- Rate limiting --
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    // -- Infrastructure --
    #[error("Encryption service failure")]
    EncryptionFailure(String),
    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl ApiError {
    /// Stable short code returned to clients and used in alerting.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAccessKey => "SEC_001",
            Self::InvalidSignature => "SEC_002",
            Self::TimestampExpired => "SEC_003",
            Self::NonceUsed => "SEC_004",
            Self::InsufficientFunds => "PAY_001",
            Self::InvalidAmount | Self::Validation(_) => "PAY_002",
            Self::DuplicateTransaction => "PAY_003",
            Self::NotFound(_) => "PAY_004",
            Self::InvalidRefund => "PAY_006",
            Self::RefundAmountExceedsOriginal => "PAY_007",
            Self::InvalidCredentials => "AUTH_001",
            Self::UsernameExists => "AUTH_002",
            Self::InvalidToken => "AUTH_003",
            Self::MerchantSuspended => "AUTH_004",
            Self::RateLimitExceeded => "RATE_001",
            Self::Internal(_) => "SYS_001",
            Self::EncryptionFailure(_) => "SYS_003",
        }
    }

    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        Self::Internal(err.into())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error_code: &'static str,
    message: String,
    request_id: String,
    timestamp: String,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidAccessKey
            | Self::InvalidSignature
            | Self::InvalidCredentials
            | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::TimestampExpired | Self::NonceUsed | Self::MerchantSuspended => {
                StatusCode::FORBIDDEN
            }
            Self::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
            Self::InvalidAmount
            | Self::Validation(_)
            | Self::InvalidRefund
            | Self::RefundAmountExceedsOriginal => StatusCode::BAD_REQUEST,
            Self::DuplicateTransaction | Self::UsernameExists => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            Self::EncryptionFailure(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Internal detail goes to the log with the request correlator; the
        // client only ever sees the stable code + message.
        match self {
            Self::Internal(cause) => {
                tracing::error!(code = self.code(), error = %cause, "internal error");
            }
            Self::EncryptionFailure(detail) => {
                tracing::error!(code = self.code(), detail = %detail, "encryption failure");
            }
            _ => {}
        }

        HttpResponse::build(self.status_code()).json(ErrorBody {
            error_code: self.code(),
            message: self.to_string(),
            request_id: crate::response::current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        })
    }
}

/// Commit-time unique violations are the authoritative duplicate check for
/// refund races; everything else from the database is an internal error.
impl From<diesel::result::Error> for ApiError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => ApiError::DuplicateTransaction,
            other => ApiError::Internal(anyhow::Error::new(other)),
        }
    }
}

impl From<diesel::r2d2::PoolError> for ApiError {
    fn from(err: diesel::r2d2::PoolError) -> Self {
        ApiError::Internal(anyhow::Error::new(err))
    }
}

/// Seal/unseal failures are fatal encryption errors. Token errors are mapped
/// explicitly at the call site instead of through this impl.
impl From<CryptoError> for ApiError {
    fn from(err: CryptoError) -> Self {
        ApiError::EncryptionFailure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ApiError::InvalidAccessKey.code(), "SEC_001");
        assert_eq!(ApiError::InvalidSignature.code(), "SEC_002");
        assert_eq!(ApiError::TimestampExpired.code(), "SEC_003");
        assert_eq!(ApiError::NonceUsed.code(), "SEC_004");
        assert_eq!(ApiError::InsufficientFunds.code(), "PAY_001");
        assert_eq!(ApiError::InvalidAmount.code(), "PAY_002");
        assert_eq!(ApiError::DuplicateTransaction.code(), "PAY_003");
        assert_eq!(ApiError::NotFound("wallet").code(), "PAY_004");
        assert_eq!(ApiError::InvalidRefund.code(), "PAY_006");
        assert_eq!(ApiError::RefundAmountExceedsOriginal.code(), "PAY_007");
        assert_eq!(ApiError::MerchantSuspended.code(), "AUTH_004");
        assert_eq!(ApiError::EncryptionFailure(String::new()).code(), "SYS_003");
    }

    #[test]
    fn http_mapping() {
        assert_eq!(
            ApiError::InsufficientFunds.status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            ApiError::DuplicateTransaction.status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::NonceUsed.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::NotFound("wallet").status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn unique_violation_surfaces_as_duplicate() {
        let err = diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            Box::new(String::from("duplicate key value")),
        );
        assert!(matches!(ApiError::from(err), ApiError::DuplicateTransaction));
    }
}
