//! Dashboard reporting: aggregate stats, transaction listing, balance.

use std::sync::Arc;

use chrono::{Duration, Utc};
use gateway_crypto_core::Sealer;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::ApiError;
use crate::models::{Transaction, TransactionListParams, TransactionStats, Wallet};

pub struct ReportingService {
    pool: DbPool,
    sealer: Arc<Sealer>,
}

impl ReportingService {
    pub fn new(pool: DbPool, sealer: Arc<Sealer>) -> Self {
        Self { pool, sealer }
    }

    /// Aggregate stats over `day`, `week`, `month` or `all`.
    pub async fn dashboard_stats(
        &self,
        merchant_id: Uuid,
        period: &str,
    ) -> Result<TransactionStats, ApiError> {
        let period_start = match period {
            "day" => Some(Utc::now() - Duration::days(1)),
            "week" => Some(Utc::now() - Duration::days(7)),
            "month" => Some(Utc::now() - Duration::days(30)),
            "all" | "" => None,
            _ => {
                return Err(ApiError::Validation(
                    "invalid period: must be day, week, month, or all".into(),
                ))
            }
        };

        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            Transaction::stats(&mut conn, merchant_id, period_start)
        })
        .await
        .map_err(|e| ApiError::internal(anyhow::anyhow!("blocking task: {e}")))?
    }

    pub async fn list_transactions(
        &self,
        params: TransactionListParams,
    ) -> Result<(Vec<Transaction>, i64), ApiError> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            Transaction::list(&mut conn, &params)
        })
        .await
        .map_err(|e| ApiError::internal(anyhow::anyhow!("blocking task: {e}")))?
    }

    /// Decrypt and return the current balance of the merchant's wallet.
    pub async fn wallet_balance(&self, merchant_id: Uuid) -> Result<(i64, String), ApiError> {
        let pool = self.pool.clone();
        let wallet = tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            Wallet::find_for_merchant(&mut conn, merchant_id, "VND")
        })
        .await
        .map_err(|e| ApiError::internal(anyhow::anyhow!("blocking task: {e}")))??
        .ok_or(ApiError::NotFound("wallet"))?;

        let plaintext = self.sealer.unseal(&wallet.encrypted_balance)?;
        let balance: i64 = plaintext.parse().map_err(|_| {
            ApiError::EncryptionFailure("sealed balance is not a decimal integer".into())
        })?;

        Ok((balance, wallet.currency))
    }
}
