//! Merchant self-management: profile, webhook endpoint, key rotation.

use std::sync::Arc;

use gateway_crypto_core::Sealer;
use rand::RngCore;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::ApiError;
use crate::models::Merchant;
use crate::validation;

#[derive(Debug, Clone, serde::Serialize)]
pub struct MerchantProfile {
    pub id: Uuid,
    pub username: String,
    pub merchant_name: String,
    pub webhook_url: Option<String>,
    pub status: String,
    pub created_at: String,
}

/// Shown exactly once, at rotation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RotatedKeys {
    pub access_key: String,
    pub secret_key: String,
}

pub struct MerchantService {
    pool: DbPool,
    sealer: Arc<Sealer>,
}

impl MerchantService {
    pub fn new(pool: DbPool, sealer: Arc<Sealer>) -> Self {
        Self { pool, sealer }
    }

    pub async fn get_profile(&self, merchant_id: Uuid) -> Result<MerchantProfile, ApiError> {
        let pool = self.pool.clone();
        let merchant = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            Merchant::find_by_id(&mut conn, merchant_id)
        })
        .await
        .map_err(|e| ApiError::internal(anyhow::anyhow!("blocking task: {e}")))??
        .ok_or(ApiError::NotFound("merchant"))?;

        Ok(MerchantProfile {
            id: merchant.id,
            username: merchant.username,
            merchant_name: merchant.merchant_name,
            webhook_url: merchant.webhook_url,
            status: merchant.status,
            created_at: merchant.created_at.to_rfc3339(),
        })
    }

    /// Set or clear the webhook endpoint.
    pub async fn update_webhook_url(
        &self,
        merchant_id: Uuid,
        webhook_url: Option<String>,
    ) -> Result<(), ApiError> {
        if let Some(url) = webhook_url.as_deref() {
            validation::validate_webhook_url(url)?;
        }

        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            Merchant::update_webhook_url(&mut conn, merchant_id, webhook_url.as_deref())
        })
        .await
        .map_err(|e| ApiError::internal(anyhow::anyhow!("blocking task: {e}")))??;

        tracing::info!(merchant_id = %merchant_id, "webhook URL updated");
        Ok(())
    }

    /// Replace both API keys. The old signature key stops verifying the
    /// moment this commits.
    pub async fn rotate_keys(&self, merchant_id: Uuid) -> Result<RotatedKeys, ApiError> {
        let mut bytes = vec![0u8; 24];
        rand::thread_rng().fill_bytes(&mut bytes);
        let access_key = format!("ak_{}", hex::encode(&bytes));

        let mut bytes = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        let secret_key = format!("sk_{}", hex::encode(&bytes));

        let secret_key_enc = self.sealer.seal(&secret_key)?;

        let pool = self.pool.clone();
        let new_access_key = access_key.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            Merchant::update_keys(&mut conn, merchant_id, &new_access_key, &secret_key_enc)
        })
        .await
        .map_err(|e| ApiError::internal(anyhow::anyhow!("blocking task: {e}")))??;

        tracing::info!(merchant_id = %merchant_id, "API keys rotated");
        Ok(RotatedKeys {
            access_key,
            secret_key,
        })
    }
}
