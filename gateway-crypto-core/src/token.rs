//! Bearer session tokens for the merchant dashboard.
//!
//! HS256-signed JWTs carrying the merchant id as subject plus the access
//! key, issued-at, expiry and issuer. Validation rejects signature
//! mismatches, expired tokens, wrong issuers and malformed subjects.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{CryptoError, CryptoResult};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    access_key: String,
    iat: i64,
    exp: i64,
    iss: String,
}

/// Validated claims handed back to the caller.
#[derive(Debug, Clone)]
pub struct TokenClaims {
    pub merchant_id: Uuid,
    pub access_key: String,
}

/// Issues and validates dashboard session tokens.
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry: Duration,
    issuer: String,
}

impl TokenSigner {
    pub fn new(secret: &str, expiry_secs: i64, issuer: impl Into<String>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry: Duration::seconds(expiry_secs),
            issuer: issuer.into(),
        }
    }

    /// Issue a token for a merchant. Returns the token and its expiry time.
    pub fn issue(
        &self,
        merchant_id: Uuid,
        access_key: &str,
    ) -> CryptoResult<(String, DateTime<Utc>)> {
        let now = Utc::now();
        let expires_at = now + self.expiry;
        let claims = Claims {
            sub: merchant_id.to_string(),
            access_key: access_key.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| CryptoError::TokenSigning(e.to_string()))?;
        Ok((token, expires_at))
    }

    /// Validate a token and extract its claims.
    pub fn validate(&self, token: &str) -> CryptoResult<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);

        let data = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|_| CryptoError::TokenInvalid)?;

        let merchant_id =
            Uuid::parse_str(&data.claims.sub).map_err(|_| CryptoError::TokenInvalid)?;

        Ok(TokenClaims {
            merchant_id,
            access_key: data.claims.access_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new("test-token-secret", 3600, "payment-gateway")
    }

    #[test]
    fn issue_then_validate() {
        let s = signer();
        let merchant_id = Uuid::new_v4();
        let (token, expires_at) = s.issue(merchant_id, "ak_test").unwrap();
        assert!(expires_at > Utc::now());

        let claims = s.validate(&token).unwrap();
        assert_eq!(claims.merchant_id, merchant_id);
        assert_eq!(claims.access_key, "ak_test");
    }

    #[test]
    fn rejects_wrong_secret() {
        let (token, _) = signer().issue(Uuid::new_v4(), "ak").unwrap();
        let other = TokenSigner::new("different-secret", 3600, "payment-gateway");
        assert!(matches!(other.validate(&token), Err(CryptoError::TokenInvalid)));
    }

    #[test]
    fn rejects_expired_token() {
        let short = TokenSigner::new("test-token-secret", -120, "payment-gateway");
        let (token, _) = short.issue(Uuid::new_v4(), "ak").unwrap();
        assert!(matches!(signer().validate(&token), Err(CryptoError::TokenInvalid)));
    }

    #[test]
    fn rejects_wrong_issuer() {
        let other = TokenSigner::new("test-token-secret", 3600, "somebody-else");
        let (token, _) = other.issue(Uuid::new_v4(), "ak").unwrap();
        assert!(matches!(signer().validate(&token), Err(CryptoError::TokenInvalid)));
    }

    #[test]
    fn rejects_malformed_subject() {
        // Same key and issuer, but sub is not a UUID.
        let s = signer();
        let claims = serde_json::json!({
            "sub": "not-a-uuid",
            "access_key": "ak",
            "iat": Utc::now().timestamp(),
            "exp": Utc::now().timestamp() + 600,
            "iss": "payment-gateway",
        });
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-token-secret"),
        )
        .unwrap();
        assert!(matches!(s.validate(&token), Err(CryptoError::TokenInvalid)));
    }

    #[test]
    fn rejects_garbage() {
        assert!(signer().validate("not.a.token").is_err());
        assert!(signer().validate("").is_err());
    }
}
