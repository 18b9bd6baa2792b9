//! Balance and secret sealing with AES-256-GCM.
//!
//! Wire format: lowercase hex of `nonce(12) || ciphertext || tag(16)`.
//! Every seal draws a fresh random nonce, so two seals of the same plaintext
//! never produce the same ciphertext. Wallet balances are stored only in this
//! form; the database never sees a plaintext amount.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use zeroize::Zeroize;

use crate::errors::{CryptoError, CryptoResult};

/// AES-GCM nonce size (12 bytes / 96 bits).
pub const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size.
pub const TAG_SIZE: usize = 16;

/// Stateful handle around a 32-byte AES-256-GCM key.
///
/// Construct once at startup from the hex-encoded key in the environment and
/// share behind an `Arc`.
pub struct Sealer {
    cipher: Aes256Gcm,
}

impl Sealer {
    /// Build a sealer from a 64-character hex key (32 bytes decoded).
    pub fn from_hex_key(hex_key: &str) -> CryptoResult<Self> {
        let mut key = hex::decode(hex_key)
            .map_err(|e| CryptoError::InvalidKey(format!("key is not valid hex: {e}")))?;
        if key.len() != 32 {
            let got = key.len();
            key.zeroize();
            return Err(CryptoError::InvalidKey(format!(
                "key must be 32 bytes, got {got}"
            )));
        }
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|e| CryptoError::InvalidKey(format!("cipher init failed: {e}")))?;
        key.zeroize();
        Ok(Self { cipher })
    }

    /// Seal a plaintext. Returns the hex wire form.
    pub fn seal(&self, plaintext: &str) -> CryptoResult<String> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Sealing)?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(hex::encode(out))
    }

    /// Unseal a hex wire-form ciphertext back to its plaintext.
    ///
    /// Fails on bad hex, inputs shorter than nonce + tag, tag mismatch, and
    /// non-UTF-8 plaintexts.
    pub fn unseal(&self, sealed: &str) -> CryptoResult<String> {
        let raw = hex::decode(sealed)
            .map_err(|e| CryptoError::MalformedCiphertext(format!("not valid hex: {e}")))?;
        if raw.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::MalformedCiphertext(format!(
                "ciphertext too short: {} bytes",
                raw.len()
            )));
        }

        let (nonce, ciphertext) = raw.split_at(NONCE_SIZE);
        let mut plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::Unsealing)?;

        match String::from_utf8(plaintext.clone()) {
            Ok(s) => {
                plaintext.zeroize();
                Ok(s)
            }
            Err(_) => {
                plaintext.zeroize();
                Err(CryptoError::Unsealing)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

    fn sealer() -> Sealer {
        Sealer::from_hex_key(TEST_KEY).unwrap()
    }

    #[test]
    fn seal_unseal_roundtrip() {
        let s = sealer();
        for plaintext in ["0", "1000000", "750000", ""] {
            let sealed = s.seal(plaintext).unwrap();
            assert_eq!(s.unseal(&sealed).unwrap(), plaintext);
        }
    }

    #[test]
    fn seals_of_same_plaintext_differ() {
        let s = sealer();
        let a = s.seal("1000000").unwrap();
        let b = s.seal("1000000").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wire_form_is_lowercase_hex() {
        let s = sealer();
        let sealed = s.seal("250000").unwrap();
        assert!(sealed.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        // nonce + tag at minimum, plus the 6 plaintext bytes
        assert_eq!(sealed.len(), (NONCE_SIZE + 6 + TAG_SIZE) * 2);
    }

    #[test]
    fn rejects_bad_hex() {
        let s = sealer();
        assert!(matches!(
            s.unseal("not-hex-at-all"),
            Err(CryptoError::MalformedCiphertext(_))
        ));
    }

    #[test]
    fn rejects_short_input() {
        let s = sealer();
        assert!(matches!(
            s.unseal("00112233"),
            Err(CryptoError::MalformedCiphertext(_))
        ));
    }

    #[test]
    fn rejects_tampered_ciphertext() {
        let s = sealer();
        let sealed = s.seal("1000000").unwrap();
        // Flip the last hex digit (inside the tag).
        let mut tampered = sealed.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == '0' { '1' } else { '0' });
        assert!(matches!(s.unseal(&tampered), Err(CryptoError::Unsealing)));
    }

    #[test]
    fn rejects_wrong_key() {
        let s = sealer();
        let other = Sealer::from_hex_key(
            "ffefddccbbaa99887766554433221100ffeeddccbbaa99887766554433221100",
        )
        .unwrap();
        let sealed = s.seal("42").unwrap();
        assert!(other.unseal(&sealed).is_err());
    }

    #[test]
    fn rejects_bad_keys() {
        assert!(Sealer::from_hex_key("zz").is_err());
        assert!(Sealer::from_hex_key("00ff").is_err());
    }
}
