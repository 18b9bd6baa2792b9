//! HMAC-SHA-256 request and webhook signatures.
//!
//! Merchants sign every money-moving request over the canonical string
//! `METHOD|PATH|TIMESTAMP|NONCE|BODY`; the gateway signs outgoing webhook
//! payloads with the same primitive. Signatures travel as 64-character
//! lowercase hex.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compute HMAC-SHA-256 of `payload` under `secret`, hex-encoded.
pub fn sign(secret: &str, payload: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a hex signature in constant time.
///
/// Returns `false` for malformed hex rather than erroring; a forged
/// signature and a garbled one are the same to the caller.
pub fn verify(secret: &str, payload: &str, signature_hex: &str) -> bool {
    let Ok(signature) = hex::decode(signature_hex) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature).is_ok()
}

/// Build the canonical request string a merchant signs.
///
/// The body is included verbatim; callers pass an empty string when the
/// request has none. This is a pure function: identical inputs always yield
/// identical bytes.
pub fn canonical_string(method: &str, path: &str, timestamp: i64, nonce: &str, body: &str) -> String {
    format!("{method}|{path}|{timestamp}|{nonce}|{body}")
}
