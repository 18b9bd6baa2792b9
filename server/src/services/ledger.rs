//! The ledger engine: Payment, Refund and Top-up over sealed balances.
//!
//! All three share one envelope: validate, resolve the idempotency key,
//! then run the balance arithmetic inside a single pessimistically-locked
//! database transaction. The engine never retries; when two operations race
//! on one wallet the loser blocks on the row lock, re-reads the committed
//! balance, and either proceeds or fails for real.

use std::sync::Arc;

use chrono::Utc;
use gateway_crypto_core::Sealer;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::idempotency::{payment_key, refund_key};
use crate::models::{IdempotencyLog, Transaction, TransactionStatus, TransactionType};
use crate::ports::{KvStore, LedgerStore};
use crate::services::idempotency::{ComputeFn, IdempotencyLayer};
use crate::validation;

/// Reference signature recorded on operator-initiated top-ups.
const TOPUP_SIGNATURE: &str = "SYSTEM_TOPUP";

#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub merchant_id: Uuid,
    pub reference_id: String,
    pub amount: i64,
    pub currency: String,
    pub signature: String,
    pub client_ip: String,
    pub extra_data: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RefundRequest {
    pub merchant_id: Uuid,
    pub original_reference_id: String,
    /// `None` refunds the full original amount.
    pub amount: Option<i64>,
    pub reason: String,
    pub signature: String,
    pub client_ip: String,
}

#[derive(Debug, Clone)]
pub struct TopupRequest {
    pub merchant_id: Uuid,
    pub amount: i64,
    pub currency: String,
}

pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    idempotency: IdempotencyLayer,
    sealer: Arc<Sealer>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn LedgerStore>, kv: Arc<dyn KvStore>, sealer: Arc<Sealer>) -> Self {
        Self {
            idempotency: IdempotencyLayer::new(Arc::clone(&store), kv),
            store,
            sealer,
        }
    }

    /// Debit the merchant wallet by `amount` under an exclusive row lock.
    pub async fn process_payment(&self, req: PaymentRequest) -> Result<Transaction, ApiError> {
        if req.amount <= 0 {
            return Err(ApiError::InvalidAmount);
        }
        validation::validate_reference(&req.reference_id)?;
        validation::validate_currency(&req.currency)?;

        let key = payment_key(req.merchant_id, &req.reference_id);
        let sealer = Arc::clone(&self.sealer);
        let idem_key = key.clone();

        let compute: ComputeFn = Box::new(move |store| {
            store.in_transaction(Box::new(move |tx| {
                let wallet = tx
                    .lock_wallet_for_merchant(req.merchant_id, &req.currency)?
                    .ok_or(ApiError::NotFound("wallet"))?;

                let balance = unseal_balance(&sealer, &wallet.encrypted_balance)?;
                if balance < req.amount {
                    return Err(ApiError::InsufficientFunds);
                }

                let new_balance_enc = sealer.seal(&(balance - req.amount).to_string())?;
                let amount_enc = sealer.seal(&req.amount.to_string())?;

                let now = Utc::now();
                let txn = Transaction {
                    id: Uuid::new_v4(),
                    reference_id: req.reference_id,
                    merchant_id: req.merchant_id,
                    wallet_id: wallet.id,
                    amount: req.amount,
                    amount_encrypted: amount_enc,
                    transaction_type: TransactionType::Payment.as_str().to_string(),
                    status: TransactionStatus::Success.as_str().to_string(),
                    signature: req.signature,
                    client_ip: req.client_ip,
                    extra_data: req.extra_data,
                    original_transaction_id: None,
                    created_at: now,
                    processed_at: Some(now),
                };

                tx.update_wallet_balance(wallet.id, &new_balance_enc)?;
                tx.insert_transaction(&txn)?;

                let response = serde_json::to_vec(&txn).map_err(ApiError::internal)?;
                tx.insert_idempotency_record(&IdempotencyLog {
                    key: idem_key,
                    transaction_id: txn.id,
                    response_json: response,
                    created_at: now,
                })?;

                Ok(txn)
            }))
        });

        let txn = self.idempotency.lookup_or_compute(&key, compute).await?;
        tracing::info!(
            tx_id = %txn.id,
            merchant_id = %txn.merchant_id,
            amount = txn.amount,
            "payment processed"
        );
        Ok(txn)
    }

    /// Credit back a successful payment, flipping the original to REVERSED
    /// in the same commit.
    pub async fn process_refund(&self, req: RefundRequest) -> Result<Transaction, ApiError> {
        validation::validate_reference(&req.original_reference_id)?;
        if req.reason.trim().is_empty() {
            return Err(ApiError::Validation("reason must not be empty".into()));
        }

        let key = refund_key(req.merchant_id, &req.original_reference_id);
        let sealer = Arc::clone(&self.sealer);
        let idem_key = key.clone();

        let compute: ComputeFn = Box::new(move |store| {
            // Advisory pre-checks; the authoritative duplicate defense is
            // the unique refund index + the idempotency record inside T.
            let original = store
                .transaction_by_reference(req.merchant_id, &req.original_reference_id)?
                .ok_or(ApiError::NotFound("original transaction"))?;
            if !original.is_refundable() {
                return Err(ApiError::InvalidRefund);
            }
            if store.refund_exists_for(original.id)? {
                return Err(ApiError::DuplicateTransaction);
            }

            let refund_amount = match req.amount {
                Some(a) if a <= 0 => return Err(ApiError::InvalidAmount),
                Some(a) if a > original.amount => {
                    return Err(ApiError::RefundAmountExceedsOriginal)
                }
                Some(a) => a,
                None => original.amount,
            };

            let original_id = original.id;
            let wallet_id = original.wallet_id;
            store.in_transaction(Box::new(move |tx| {
                let wallet = tx
                    .lock_wallet(wallet_id)?
                    .ok_or(ApiError::NotFound("wallet"))?;

                let balance = unseal_balance(&sealer, &wallet.encrypted_balance)?;
                let new_balance_enc = sealer.seal(&(balance + refund_amount).to_string())?;
                let amount_enc = sealer.seal(&refund_amount.to_string())?;

                let now = Utc::now();
                let txn = Transaction {
                    id: Uuid::new_v4(),
                    reference_id: format!("REFUND-{}", req.original_reference_id),
                    merchant_id: req.merchant_id,
                    wallet_id: wallet.id,
                    amount: refund_amount,
                    amount_encrypted: amount_enc,
                    transaction_type: TransactionType::Refund.as_str().to_string(),
                    status: TransactionStatus::Success.as_str().to_string(),
                    signature: req.signature,
                    client_ip: req.client_ip,
                    extra_data: Some(req.reason),
                    original_transaction_id: Some(original_id),
                    created_at: now,
                    processed_at: Some(now),
                };

                tx.update_wallet_balance(wallet.id, &new_balance_enc)?;
                tx.insert_transaction(&txn)?;
                tx.update_transaction_status(original_id, TransactionStatus::Reversed)?;

                let response = serde_json::to_vec(&txn).map_err(ApiError::internal)?;
                tx.insert_idempotency_record(&IdempotencyLog {
                    key: idem_key,
                    transaction_id: txn.id,
                    response_json: response,
                    created_at: now,
                })?;

                Ok(txn)
            }))
        });

        let txn = self.idempotency.lookup_or_compute(&key, compute).await?;
        tracing::info!(
            tx_id = %txn.id,
            original_tx_id = ?txn.original_transaction_id,
            refund_amount = txn.amount,
            "refund processed"
        );
        Ok(txn)
    }

    /// Credit the wallet. Carries no idempotency key; retries double-credit.
    pub async fn process_topup(&self, req: TopupRequest) -> Result<Transaction, ApiError> {
        if req.amount <= 0 {
            return Err(ApiError::InvalidAmount);
        }
        validation::validate_currency(&req.currency)?;

        let sealer = Arc::clone(&self.sealer);
        let store = Arc::clone(&self.store);

        let txn = tokio::task::spawn_blocking(move || {
            store.in_transaction(Box::new(move |tx| {
                let wallet = tx
                    .lock_wallet_for_merchant(req.merchant_id, &req.currency)?
                    .ok_or(ApiError::NotFound("wallet"))?;

                let balance = unseal_balance(&sealer, &wallet.encrypted_balance)?;
                let new_balance_enc = sealer.seal(&(balance + req.amount).to_string())?;
                let amount_enc = sealer.seal(&req.amount.to_string())?;

                let now = Utc::now();
                let merchant_str = req.merchant_id.to_string();
                let txn = Transaction {
                    id: Uuid::new_v4(),
                    reference_id: format!(
                        "TOPUP-{}-{}",
                        &merchant_str[..8],
                        now.timestamp_millis()
                    ),
                    merchant_id: req.merchant_id,
                    wallet_id: wallet.id,
                    amount: req.amount,
                    amount_encrypted: amount_enc,
                    transaction_type: TransactionType::Topup.as_str().to_string(),
                    status: TransactionStatus::Success.as_str().to_string(),
                    signature: TOPUP_SIGNATURE.to_string(),
                    client_ip: String::new(),
                    extra_data: None,
                    original_transaction_id: None,
                    created_at: now,
                    processed_at: Some(now),
                };

                tx.update_wallet_balance(wallet.id, &new_balance_enc)?;
                tx.insert_transaction(&txn)?;

                Ok(txn)
            }))
        })
        .await
        .map_err(|e| ApiError::internal(anyhow::anyhow!("blocking task: {e}")))??;

        tracing::info!(
            tx_id = %txn.id,
            merchant_id = %txn.merchant_id,
            amount = txn.amount,
            "topup processed"
        );
        Ok(txn)
    }
}

/// Unseal a wallet balance and parse it. A plaintext that is not a decimal
/// integer is a fatal encryption failure, never zero.
fn unseal_balance(sealer: &Sealer, sealed: &str) -> Result<i64, ApiError> {
    let plaintext = sealer.unseal(sealed)?;
    plaintext.parse::<i64>().map_err(|_| {
        ApiError::EncryptionFailure("sealed balance is not a decimal integer".into())
    })
}
