//! Merchant registration and dashboard login.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use gateway_crypto_core::{password, Sealer, TokenSigner};
use rand::RngCore;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::ApiError;
use crate::models::{Merchant, MerchantStatus, Wallet};
use crate::validation;

/// Currency of the wallet every merchant starts with.
const DEFAULT_CURRENCY: &str = "VND";

/// Shown exactly once, at registration.
#[derive(Debug, Clone)]
pub struct RegisterOutcome {
    pub merchant_id: Uuid,
    pub access_key: String,
    pub secret_key: String,
}

pub struct AuthService {
    pool: DbPool,
    sealer: Arc<Sealer>,
    token_signer: Arc<TokenSigner>,
}

impl AuthService {
    pub fn new(pool: DbPool, sealer: Arc<Sealer>, token_signer: Arc<TokenSigner>) -> Self {
        Self {
            pool,
            sealer,
            token_signer,
        }
    }

    /// Create a merchant account plus its default wallet in one commit.
    pub async fn register(
        &self,
        username: String,
        password_plain: String,
        merchant_name: String,
        webhook_url: Option<String>,
    ) -> Result<RegisterOutcome, ApiError> {
        validation::validate_username(&username)?;
        validation::validate_password(&password_plain, &[&username, &merchant_name])?;
        if let Some(url) = webhook_url.as_deref() {
            validation::validate_webhook_url(url)?;
        }

        let pool = self.pool.clone();
        let sealer = Arc::clone(&self.sealer);

        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;

            if Merchant::find_by_username(&mut conn, &username)?.is_some() {
                return Err(ApiError::UsernameExists);
            }

            let access_key = generate_hex_key(32);
            let secret_key = generate_hex_key(32);

            let password_hash =
                password::hash_password(&password_plain).map_err(ApiError::internal)?;
            let secret_key_enc = sealer.seal(&secret_key)?;
            let sealed_zero = sealer.seal("0")?;

            let now = Utc::now();
            let merchant = Merchant {
                id: Uuid::new_v4(),
                username,
                password_hash,
                merchant_name,
                access_key: access_key.clone(),
                secret_key_enc,
                webhook_url,
                status: MerchantStatus::Active.as_str().to_string(),
                created_at: now,
                updated_at: now,
            };
            let wallet = Wallet {
                id: Uuid::new_v4(),
                merchant_id: merchant.id,
                currency: DEFAULT_CURRENCY.to_string(),
                encrypted_balance: sealed_zero,
                created_at: now,
                updated_at: now,
            };

            diesel::Connection::transaction::<_, ApiError, _>(&mut conn, |conn| {
                Merchant::create(conn, &merchant)?;
                Wallet::create(conn, &wallet)?;
                Ok(())
            })?;

            tracing::info!(merchant_id = %merchant.id, "merchant registered");
            Ok(RegisterOutcome {
                merchant_id: merchant.id,
                access_key,
                secret_key,
            })
        })
        .await
        .map_err(|e| ApiError::internal(anyhow::anyhow!("blocking task: {e}")))?
    }

    /// Verify credentials and issue a bearer token.
    pub async fn login(
        &self,
        username: String,
        password_plain: String,
    ) -> Result<(String, DateTime<Utc>), ApiError> {
        let pool = self.pool.clone();
        let merchant = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            Merchant::find_by_username(&mut conn, &username)
        })
        .await
        .map_err(|e| ApiError::internal(anyhow::anyhow!("blocking task: {e}")))??
        .ok_or(ApiError::InvalidCredentials)?;

        let stored_hash = merchant.password_hash.clone();
        let valid = tokio::task::spawn_blocking(move || {
            password::verify_password(&password_plain, &stored_hash)
        })
        .await
        .map_err(|e| ApiError::internal(anyhow::anyhow!("blocking task: {e}")))?
        .map_err(ApiError::internal)?;

        if !valid {
            return Err(ApiError::InvalidCredentials);
        }
        if !merchant.is_active() {
            return Err(ApiError::MerchantSuspended);
        }

        self.token_signer
            .issue(merchant.id, &merchant.access_key)
            .map_err(ApiError::internal)
    }
}

/// Random hex string of `n_bytes` entropy.
pub fn generate_hex_key(n_bytes: usize) -> String {
    let mut bytes = vec![0u8; n_bytes];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
