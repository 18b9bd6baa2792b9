use thiserror::Error;

/// Result alias used across the crate.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors produced by the crypto primitives.
///
/// `Unsealing` deliberately carries no detail: a tag mismatch and a truncated
/// ciphertext are indistinguishable to callers, so neither leaks which one
/// happened.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("sealing failed")]
    Sealing,

    #[error("unsealing failed")]
    Unsealing,

    #[error("malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("token signing failed: {0}")]
    TokenSigning(String),

    #[error("token invalid")]
    TokenInvalid,
}
