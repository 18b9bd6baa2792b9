//! Two-tier idempotency: Redis fast tier over the durable database log.
//!
//! The durable record is authoritative; the cache only saves a round trip.
//! Cache failures are logged and never fail the operation — except that a
//! cache *miss* is of course not a success.

use std::sync::Arc;
use std::time::Duration;

use crate::error::ApiError;
use crate::models::Transaction;
use crate::ports::{KvStore, LedgerStore};

/// Cached responses live for a day; the durable log lives forever.
pub const IDEMPOTENCY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const CACHE_PREFIX: &str = "idempotency:";

/// One effectful computation, run at most once per key within retention.
/// Receives the store so it can wrap its work in a single transaction.
pub type ComputeFn = Box<dyn FnOnce(&dyn LedgerStore) -> Result<Transaction, ApiError> + Send>;

pub struct IdempotencyLayer {
    store: Arc<dyn LedgerStore>,
    kv: Arc<dyn KvStore>,
}

impl IdempotencyLayer {
    pub fn new(store: Arc<dyn LedgerStore>, kv: Arc<dyn KvStore>) -> Self {
        Self { store, kv }
    }

    /// Return the recorded response for `key` if one exists, otherwise run
    /// `compute` (which must write the idempotency record inside its own
    /// commit) and cache its serialized result.
    pub async fn lookup_or_compute(
        &self,
        key: &str,
        compute: ComputeFn,
    ) -> Result<Transaction, ApiError> {
        let cache_key = format!("{CACHE_PREFIX}{key}");

        // Tier 1: cache.
        match self.kv.get(&cache_key).await {
            Ok(Some(bytes)) => return decode_cached(&bytes),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(key, error = %e, "idempotency cache read failed, falling through to database");
            }
        }

        // Tier 2: durable log.
        let store = Arc::clone(&self.store);
        let lookup_key = key.to_string();
        let record = tokio::task::spawn_blocking(move || store.idempotency_record(&lookup_key))
            .await
            .map_err(|e| ApiError::internal(anyhow::anyhow!("blocking task: {e}")))??;
        if let Some(record) = record {
            if let Err(e) = self
                .kv
                .set(&cache_key, &record.response_json, IDEMPOTENCY_TTL)
                .await
            {
                tracing::warn!(key, error = %e, "idempotency cache repopulation failed");
            }
            return decode_cached(&record.response_json);
        }

        // Fresh intent: run the work.
        let store = Arc::clone(&self.store);
        let txn = tokio::task::spawn_blocking(move || compute(store.as_ref()))
            .await
            .map_err(|e| ApiError::internal(anyhow::anyhow!("blocking task: {e}")))??;

        let bytes = serde_json::to_vec(&txn).map_err(ApiError::internal)?;
        if let Err(e) = self.kv.set(&cache_key, &bytes, IDEMPOTENCY_TTL).await {
            tracing::warn!(key, error = %e, "idempotency cache write failed, durable log remains authoritative");
        }

        Ok(txn)
    }
}

fn decode_cached(bytes: &[u8]) -> Result<Transaction, ApiError> {
    serde_json::from_slice(bytes).map_err(ApiError::internal)
}
