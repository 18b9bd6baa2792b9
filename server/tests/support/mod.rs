//! In-memory implementations of the storage ports, for driving the ledger
//! engine and the request gate without PostgreSQL or Redis.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

use gateway_crypto_core::Sealer;
use server::error::ApiError;
use server::models::{
    IdempotencyLog, Merchant, MerchantStatus, Transaction, TransactionStatus, TransactionType,
    Wallet, WebhookDelivery,
};
use server::ports::{
    KvError, KvStore, LedgerStore, LedgerTx, LedgerWork, MerchantDirectory, WebhookDeliveryStore,
};

pub const TEST_AES_KEY: &str = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";

pub fn sealer() -> Arc<Sealer> {
    Arc::new(Sealer::from_hex_key(TEST_AES_KEY).unwrap())
}

// ---------------------------------------------------------------------------
// Ledger store
// ---------------------------------------------------------------------------

#[derive(Default, Clone)]
struct MemState {
    wallets: HashMap<Uuid, Wallet>,
    transactions: HashMap<Uuid, Transaction>,
    idempotency: HashMap<String, IdempotencyLog>,
}

/// Ledger store over a mutex-guarded map. `in_transaction` holds the lock
/// for the whole work body, which serializes transactions the way row locks
/// do, and applies the scratch state only on `Ok`.
#[derive(Default)]
pub struct MemLedgerStore {
    state: Mutex<MemState>,
}

impl MemLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_wallet(&self, wallet: Wallet) {
        self.state
            .lock()
            .unwrap()
            .wallets
            .insert(wallet.id, wallet);
    }

    pub fn wallet(&self, id: Uuid) -> Option<Wallet> {
        self.state.lock().unwrap().wallets.get(&id).cloned()
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.state
            .lock()
            .unwrap()
            .transactions
            .values()
            .cloned()
            .collect()
    }

    pub fn transaction(&self, id: Uuid) -> Option<Transaction> {
        self.state.lock().unwrap().transactions.get(&id).cloned()
    }

    pub fn idempotency_count(&self) -> usize {
        self.state.lock().unwrap().idempotency.len()
    }

    pub fn remove_idempotency(&self, key: &str) {
        self.state.lock().unwrap().idempotency.remove(key);
    }
}

struct MemTx {
    state: MemState,
}

impl LedgerTx for MemTx {
    fn lock_wallet_for_merchant(
        &mut self,
        merchant_id: Uuid,
        currency: &str,
    ) -> Result<Option<Wallet>, ApiError> {
        Ok(self
            .state
            .wallets
            .values()
            .find(|w| w.merchant_id == merchant_id && w.currency == currency)
            .cloned())
    }

    fn lock_wallet(&mut self, wallet_id: Uuid) -> Result<Option<Wallet>, ApiError> {
        Ok(self.state.wallets.get(&wallet_id).cloned())
    }

    fn update_wallet_balance(
        &mut self,
        wallet_id: Uuid,
        encrypted_balance: &str,
    ) -> Result<(), ApiError> {
        let wallet = self
            .state
            .wallets
            .get_mut(&wallet_id)
            .ok_or(ApiError::NotFound("wallet"))?;
        wallet.encrypted_balance = encrypted_balance.to_string();
        wallet.updated_at = Utc::now();
        Ok(())
    }

    fn insert_transaction(&mut self, txn: &Transaction) -> Result<(), ApiError> {
        // UNIQUE (merchant_id, reference_id)
        if self.state.transactions.values().any(|t| {
            t.merchant_id == txn.merchant_id && t.reference_id == txn.reference_id
        }) {
            return Err(ApiError::DuplicateTransaction);
        }
        // Partial unique index: one live refund per original.
        if txn.transaction_type == TransactionType::Refund.as_str()
            && txn.status != TransactionStatus::Failed.as_str()
        {
            if let Some(original) = txn.original_transaction_id {
                if self.state.transactions.values().any(|t| {
                    t.original_transaction_id == Some(original)
                        && t.transaction_type == TransactionType::Refund.as_str()
                        && t.status != TransactionStatus::Failed.as_str()
                }) {
                    return Err(ApiError::DuplicateTransaction);
                }
            }
        }
        self.state.transactions.insert(txn.id, txn.clone());
        Ok(())
    }

    fn update_transaction_status(
        &mut self,
        id: Uuid,
        status: TransactionStatus,
    ) -> Result<(), ApiError> {
        let txn = self
            .state
            .transactions
            .get_mut(&id)
            .ok_or(ApiError::NotFound("transaction"))?;
        txn.status = status.as_str().to_string();
        txn.processed_at = Some(Utc::now());
        Ok(())
    }

    fn insert_idempotency_record(&mut self, record: &IdempotencyLog) -> Result<(), ApiError> {
        if self.state.idempotency.contains_key(&record.key) {
            return Err(ApiError::DuplicateTransaction);
        }
        self.state
            .idempotency
            .insert(record.key.clone(), record.clone());
        Ok(())
    }
}

impl LedgerStore for MemLedgerStore {
    fn transaction_by_reference(
        &self,
        merchant_id: Uuid,
        reference_id: &str,
    ) -> Result<Option<Transaction>, ApiError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .transactions
            .values()
            .find(|t| t.merchant_id == merchant_id && t.reference_id == reference_id)
            .cloned())
    }

    fn refund_exists_for(&self, original_transaction_id: Uuid) -> Result<bool, ApiError> {
        Ok(self.state.lock().unwrap().transactions.values().any(|t| {
            t.original_transaction_id == Some(original_transaction_id)
                && t.transaction_type == TransactionType::Refund.as_str()
                && t.status != TransactionStatus::Failed.as_str()
        }))
    }

    fn idempotency_record(&self, key: &str) -> Result<Option<IdempotencyLog>, ApiError> {
        Ok(self.state.lock().unwrap().idempotency.get(key).cloned())
    }

    fn in_transaction(&self, work: LedgerWork) -> Result<Transaction, ApiError> {
        let mut guard = self.state.lock().unwrap();
        let mut tx = MemTx {
            state: guard.clone(),
        };
        match work(&mut tx) {
            Ok(txn) => {
                *guard = tx.state;
                Ok(txn)
            }
            Err(e) => Err(e),
        }
    }
}

// ---------------------------------------------------------------------------
// KV store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemKvStore {
    entries: Mutex<HashMap<String, (Vec<u8>, Instant)>>,
}

impl MemKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn live_entry(entries: &mut HashMap<String, (Vec<u8>, Instant)>, key: &str) -> Option<Vec<u8>> {
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Some(value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl KvStore for MemKvStore {
    async fn claim_if_absent(&self, key: &str, ttl: Duration) -> Result<bool, KvError> {
        let mut entries = self.entries.lock().unwrap();
        if Self::live_entry(&mut entries, key).is_some() {
            return Ok(false);
        }
        entries.insert(key.to_string(), (b"1".to_vec(), Instant::now() + ttl));
        Ok(true)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, KvError> {
        let mut entries = self.entries.lock().unwrap();
        Ok(Self::live_entry(&mut entries, key))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), KvError> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_vec(), Instant::now() + ttl));
        Ok(())
    }

    async fn incr_with_ttl(&self, key: &str, ttl: Duration) -> Result<i64, KvError> {
        let mut entries = self.entries.lock().unwrap();
        let current = Self::live_entry(&mut entries, key)
            .and_then(|v| String::from_utf8(v).ok())
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0);
        let next = current + 1;
        let expires_at = match entries.get(key) {
            Some((_, e)) if *e > Instant::now() => *e,
            _ => Instant::now() + ttl,
        };
        entries.insert(key.to_string(), (next.to_string().into_bytes(), expires_at));
        Ok(next)
    }
}

/// KV store that is always down, for exercising the degraded modes.
pub struct FailingKvStore;

#[async_trait]
impl KvStore for FailingKvStore {
    async fn claim_if_absent(&self, _key: &str, _ttl: Duration) -> Result<bool, KvError> {
        Err(KvError("kv offline".into()))
    }

    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, KvError> {
        Err(KvError("kv offline".into()))
    }

    async fn set(&self, _key: &str, _value: &[u8], _ttl: Duration) -> Result<(), KvError> {
        Err(KvError("kv offline".into()))
    }

    async fn incr_with_ttl(&self, _key: &str, _ttl: Duration) -> Result<i64, KvError> {
        Err(KvError("kv offline".into()))
    }
}

// ---------------------------------------------------------------------------
// Merchant directory + webhook delivery store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemMerchantDirectory {
    merchants: Mutex<HashMap<Uuid, Merchant>>,
    wallets: Mutex<HashMap<Uuid, Wallet>>,
}

impl MemMerchantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_merchant(&self, merchant: Merchant) {
        self.merchants
            .lock()
            .unwrap()
            .insert(merchant.id, merchant);
    }

    pub fn add_wallet(&self, wallet: Wallet) {
        self.wallets.lock().unwrap().insert(wallet.id, wallet);
    }
}

impl MerchantDirectory for MemMerchantDirectory {
    fn merchant_by_access_key(&self, access_key: &str) -> Result<Option<Merchant>, ApiError> {
        Ok(self
            .merchants
            .lock()
            .unwrap()
            .values()
            .find(|m| m.access_key == access_key)
            .cloned())
    }

    fn merchant_by_id(&self, id: Uuid) -> Result<Option<Merchant>, ApiError> {
        Ok(self.merchants.lock().unwrap().get(&id).cloned())
    }

    fn wallet_by_id(&self, id: Uuid) -> Result<Option<Wallet>, ApiError> {
        Ok(self.wallets.lock().unwrap().get(&id).cloned())
    }
}

#[derive(Default)]
pub struct MemWebhookStore {
    logs: Mutex<HashMap<Uuid, WebhookDelivery>>,
}

impl MemWebhookStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, id: Uuid) -> Option<WebhookDelivery> {
        self.logs.lock().unwrap().get(&id).cloned()
    }

    pub fn all(&self) -> Vec<WebhookDelivery> {
        self.logs.lock().unwrap().values().cloned().collect()
    }
}

impl WebhookDeliveryStore for MemWebhookStore {
    fn create(&self, log: &WebhookDelivery) -> Result<(), ApiError> {
        self.logs.lock().unwrap().insert(log.id, log.clone());
        Ok(())
    }

    fn save(&self, log: &WebhookDelivery) -> Result<(), ApiError> {
        self.logs.lock().unwrap().insert(log.id, log.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn make_merchant(sealer: &Sealer, secret_key: &str, status: MerchantStatus) -> Merchant {
    let now = Utc::now();
    Merchant {
        id: Uuid::new_v4(),
        username: format!("shop-{}", Uuid::new_v4().simple()),
        password_hash: String::new(),
        merchant_name: "Test Shop".into(),
        access_key: format!("ak_{}", Uuid::new_v4().simple()),
        secret_key_enc: sealer.seal(secret_key).unwrap(),
        webhook_url: None,
        status: status.as_str().to_string(),
        created_at: now,
        updated_at: now,
    }
}

pub fn make_wallet(sealer: &Sealer, merchant_id: Uuid, currency: &str, balance: i64) -> Wallet {
    let now = Utc::now();
    Wallet {
        id: Uuid::new_v4(),
        merchant_id,
        currency: currency.into(),
        encrypted_balance: sealer.seal(&balance.to_string()).unwrap(),
        created_at: now,
        updated_at: now,
    }
}
