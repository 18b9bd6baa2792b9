//! PostgreSQL implementations of the storage ports.

use diesel::prelude::*;
use diesel::PgConnection;
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::ApiError;
use crate::models::{IdempotencyLog, Merchant, Transaction, TransactionStatus, Wallet, WebhookDelivery};
use crate::ports::{LedgerStore, LedgerTx, LedgerWork, MerchantDirectory, WebhookDeliveryStore};

pub struct PgLedgerStore {
    pool: DbPool,
}

impl PgLedgerStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

struct PgLedgerTx<'a> {
    conn: &'a mut PgConnection,
}

impl LedgerTx for PgLedgerTx<'_> {
    fn lock_wallet_for_merchant(
        &mut self,
        merchant_id: Uuid,
        currency: &str,
    ) -> Result<Option<Wallet>, ApiError> {
        Wallet::lock_for_merchant(self.conn, merchant_id, currency)
    }

    fn lock_wallet(&mut self, wallet_id: Uuid) -> Result<Option<Wallet>, ApiError> {
        Wallet::lock_by_id(self.conn, wallet_id)
    }

    fn update_wallet_balance(
        &mut self,
        wallet_id: Uuid,
        encrypted_balance: &str,
    ) -> Result<(), ApiError> {
        Wallet::update_balance(self.conn, wallet_id, encrypted_balance)
    }

    fn insert_transaction(&mut self, txn: &Transaction) -> Result<(), ApiError> {
        Transaction::insert(self.conn, txn)
    }

    fn update_transaction_status(
        &mut self,
        id: Uuid,
        status: TransactionStatus,
    ) -> Result<(), ApiError> {
        Transaction::update_status(self.conn, id, status)
    }

    fn insert_idempotency_record(&mut self, record: &IdempotencyLog) -> Result<(), ApiError> {
        IdempotencyLog::insert(self.conn, record)
    }
}

impl LedgerStore for PgLedgerStore {
    fn transaction_by_reference(
        &self,
        merchant_id: Uuid,
        reference_id: &str,
    ) -> Result<Option<Transaction>, ApiError> {
        let mut conn = self.pool.get()?;
        Transaction::find_by_reference(&mut conn, merchant_id, reference_id)
    }

    fn refund_exists_for(&self, original_transaction_id: Uuid) -> Result<bool, ApiError> {
        let mut conn = self.pool.get()?;
        Transaction::refund_exists(&mut conn, original_transaction_id)
    }

    fn idempotency_record(&self, key: &str) -> Result<Option<IdempotencyLog>, ApiError> {
        let mut conn = self.pool.get()?;
        IdempotencyLog::find(&mut conn, key)
    }

    fn in_transaction(&self, work: LedgerWork) -> Result<Transaction, ApiError> {
        let mut conn = self.pool.get()?;
        // diesel rolls back on Err and maps commit-time unique violations
        // through From<diesel::result::Error> to DuplicateTransaction.
        conn.transaction::<Transaction, ApiError, _>(|conn| work(&mut PgLedgerTx { conn }))
    }
}

pub struct PgMerchantDirectory {
    pool: DbPool,
}

impl PgMerchantDirectory {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl MerchantDirectory for PgMerchantDirectory {
    fn merchant_by_access_key(&self, access_key: &str) -> Result<Option<Merchant>, ApiError> {
        let mut conn = self.pool.get()?;
        Merchant::find_by_access_key(&mut conn, access_key)
    }

    fn merchant_by_id(&self, id: Uuid) -> Result<Option<Merchant>, ApiError> {
        let mut conn = self.pool.get()?;
        Merchant::find_by_id(&mut conn, id)
    }

    fn wallet_by_id(&self, id: Uuid) -> Result<Option<Wallet>, ApiError> {
        let mut conn = self.pool.get()?;
        Wallet::find_by_id(&mut conn, id)
    }
}

pub struct PgWebhookDeliveryStore {
    pool: DbPool,
}

impl PgWebhookDeliveryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl WebhookDeliveryStore for PgWebhookDeliveryStore {
    fn create(&self, log: &WebhookDelivery) -> Result<(), ApiError> {
        let mut conn = self.pool.get()?;
        WebhookDelivery::insert(&mut conn, log)
    }

    fn save(&self, log: &WebhookDelivery) -> Result<(), ApiError> {
        let mut conn = self.pool.get()?;
        WebhookDelivery::save(&mut conn, log)
    }
}
