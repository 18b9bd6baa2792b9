//! Crypto primitives for the payment gateway.
//!
//! Everything in this crate is deterministic and stateless (apart from the
//! fresh randomness each seal and salt draws). The server crate builds the
//! ledger, the request gate and the webhook signer on top of these four
//! primitives:
//!
//! - [`aead`]: AES-256-GCM sealing of balances and merchant secrets
//! - [`signature`]: HMAC-SHA-256 request/webhook signatures and the
//!   canonical request string
//! - [`password`]: Argon2id password hashing for the dashboard login
//! - [`token`]: HS256 bearer tokens for the dashboard session

pub mod aead;
pub mod errors;
pub mod password;
pub mod signature;
pub mod token;

pub use aead::Sealer;
pub use errors::{CryptoError, CryptoResult};
pub use signature::{canonical_string, sign, verify};
pub use token::{TokenClaims, TokenSigner};
