//! Argon2id password hashing for the dashboard login path.
//!
//! Parameters: time cost 1, 64 MiB memory, 4 lanes, 32-byte tag, 16-byte
//! random salt. The PHC string output is self-describing (algorithm id,
//! version, params, salt, tag), so verification reconstructs the parameters
//! from the stored hash rather than from this module's constants.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::errors::{CryptoError, CryptoResult};

const MEMORY_KIB: u32 = 64 * 1024;
const TIME_COST: u32 = 1;
const LANES: u32 = 4;
const TAG_LEN: usize = 32;

fn hasher() -> Argon2<'static> {
    let params =
        Params::new(MEMORY_KIB, TIME_COST, LANES, Some(TAG_LEN)).expect("static Argon2 params");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Hash a password into its PHC string form.
pub fn hash_password(password: &str) -> CryptoResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CryptoError::PasswordHash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC string.
///
/// Returns `Ok(false)` on mismatch; `Err` only when the stored hash itself
/// is unparseable.
pub fn verify_password(password: &str, encoded: &str) -> CryptoResult<bool> {
    let parsed =
        PasswordHash::new(encoded).map_err(|e| CryptoError::PasswordHash(e.to_string()))?;
    Ok(hasher()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("c0rr3ct-h0rs3-b4tt3ry").unwrap();
        assert!(verify_password("c0rr3ct-h0rs3-b4tt3ry", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn encoded_form_is_self_describing() {
        let hash = hash_password("whatever").unwrap();
        assert!(hash.starts_with("$argon2id$v=19$"));
        assert!(hash.contains("m=65536,t=1,p=4"));
    }

    #[test]
    fn same_password_hashes_differently() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_unparseable_hash() {
        assert!(verify_password("pw", "not-a-phc-string").is_err());
    }
}
