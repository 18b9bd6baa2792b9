//! Storage capabilities consumed by the ledger engine and its neighbors.
//!
//! The engine never touches diesel or redis types directly; it talks to
//! these traits and gets back the domain models. `stores::pg` and
//! `redis_pool` provide the production implementations; the integration
//! tests provide in-memory ones.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{IdempotencyLog, Merchant, Transaction, TransactionStatus, Wallet, WebhookDelivery};

/// Operations available inside one open database transaction.
///
/// Both lock methods acquire a row-level exclusive lock held until the
/// transaction ends; a concurrent locker blocks until then.
pub trait LedgerTx {
    fn lock_wallet_for_merchant(
        &mut self,
        merchant_id: Uuid,
        currency: &str,
    ) -> Result<Option<Wallet>, ApiError>;

    fn lock_wallet(&mut self, wallet_id: Uuid) -> Result<Option<Wallet>, ApiError>;

    fn update_wallet_balance(
        &mut self,
        wallet_id: Uuid,
        encrypted_balance: &str,
    ) -> Result<(), ApiError>;

    fn insert_transaction(&mut self, txn: &Transaction) -> Result<(), ApiError>;

    fn update_transaction_status(
        &mut self,
        id: Uuid,
        status: TransactionStatus,
    ) -> Result<(), ApiError>;

    fn insert_idempotency_record(&mut self, record: &IdempotencyLog) -> Result<(), ApiError>;
}

/// The body of one atomic ledger operation: runs with the transaction ops,
/// commits on `Ok`, rolls back on `Err`.
pub type LedgerWork = Box<dyn FnOnce(&mut dyn LedgerTx) -> Result<Transaction, ApiError> + Send>;

/// Relational capabilities of the ledger engine. All methods are blocking;
/// the engine runs them on the blocking thread pool.
pub trait LedgerStore: Send + Sync {
    fn transaction_by_reference(
        &self,
        merchant_id: Uuid,
        reference_id: &str,
    ) -> Result<Option<Transaction>, ApiError>;

    fn refund_exists_for(&self, original_transaction_id: Uuid) -> Result<bool, ApiError>;

    fn idempotency_record(&self, key: &str) -> Result<Option<IdempotencyLog>, ApiError>;

    /// Run `work` inside a single serial transaction. A commit-time unique
    /// violation surfaces as `ApiError::DuplicateTransaction`.
    fn in_transaction(&self, work: LedgerWork) -> Result<Transaction, ApiError>;
}

/// Merchant lookup used by the authenticity pipeline and webhook builder.
pub trait MerchantDirectory: Send + Sync {
    fn merchant_by_access_key(&self, access_key: &str) -> Result<Option<Merchant>, ApiError>;
    fn merchant_by_id(&self, id: Uuid) -> Result<Option<Merchant>, ApiError>;
    fn wallet_by_id(&self, id: Uuid) -> Result<Option<Wallet>, ApiError>;
}

/// Errors from the key/value tier. Callers decide whether these degrade or
/// fail the operation; most paths warn and continue.
#[derive(Debug, Error)]
#[error("kv store: {0}")]
pub struct KvError(pub String);

/// Key/value capabilities: nonce claims, the idempotency fast tier and the
/// fixed-window rate-limit counters.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Atomically claim `key` if absent. Returns `true` when this call
    /// created the entry, `false` when it already existed.
    async fn claim_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, KvError>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError>;

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), KvError>;

    /// Fixed-window counter: increment and return the new count, applying
    /// `ttl` when the key is created.
    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, KvError>;
}

/// Persistence for webhook delivery logs. Implementations include a no-op
/// variant injected when persistence is disabled.
pub trait WebhookDeliveryStore: Send + Sync {
    fn create(&self, log: &WebhookDelivery) -> Result<(), ApiError>;
    fn save(&self, log: &WebhookDelivery) -> Result<(), ApiError>;
}

/// Disabled persistence: every write succeeds and goes nowhere.
pub struct NoopWebhookDeliveryStore;

impl WebhookDeliveryStore for NoopWebhookDeliveryStore {
    fn create(&self, _log: &WebhookDelivery) -> Result<(), ApiError> {
        Ok(())
    }

    fn save(&self, _log: &WebhookDelivery) -> Result<(), ApiError> {
        Ok(())
    }
}
