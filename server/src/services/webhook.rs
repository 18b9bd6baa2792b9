//! Webhook delivery: at-least-once, bounded retry, persisted state machine.
//!
//! `enqueue` resolves the merchant endpoint, signs the payload with the
//! merchant's secret and spawns one delivery task per transaction. The
//! caller only waits for that much; delivery itself never blocks a ledger
//! commit.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use gateway_crypto_core::Sealer;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::ApiError;
use crate::models::{DeliveryStatus, Transaction, TransactionType, WebhookDelivery};
use crate::ports::{MerchantDirectory, WebhookDeliveryStore};

/// Sleep before each retry; one immediate attempt precedes these.
pub const RETRY_INTERVALS: [Duration; 5] = [
    Duration::from_secs(15),
    Duration::from_secs(60),
    Duration::from_secs(120),
    Duration::from_secs(300),
    Duration::from_secs(600),
];

const DELIVERY_TIMEOUT_SECS: u64 = 30;

pub const EVENT_PAYMENT_UPDATE: &str = "PAYMENT_UPDATE";
pub const EVENT_REFUND_UPDATE: &str = "REFUND_UPDATE";
pub const EVENT_TOPUP_UPDATE: &str = "TOPUP_UPDATE";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayloadData {
    pub merchant_order_id: String,
    pub gateway_transaction_id: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    pub reason: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub event_type: String,
    pub data: WebhookPayloadData,
    /// HMAC of `JSON(data)` under the merchant's secret key.
    pub signature: String,
}

pub fn event_type_for(transaction_type: &str) -> &'static str {
    if transaction_type == TransactionType::Refund.as_str() {
        EVENT_REFUND_UPDATE
    } else if transaction_type == TransactionType::Topup.as_str() {
        EVENT_TOPUP_UPDATE
    } else {
        EVENT_PAYMENT_UPDATE
    }
}

/// Build and sign the payload for one terminal transaction.
pub fn build_payload(txn: &Transaction, secret_key: &str, currency: &str) -> WebhookPayload {
    let data = WebhookPayloadData {
        merchant_order_id: txn.reference_id.clone(),
        gateway_transaction_id: txn.id.to_string(),
        status: txn.status.clone(),
        amount: txn.amount,
        currency: currency.to_string(),
        reason: format!("Transaction {}", txn.status),
        timestamp: Utc::now().timestamp(),
    };
    let data_json = serde_json::to_string(&data).expect("payload data serializes");
    let signature = gateway_crypto_core::sign(secret_key, &data_json);

    WebhookPayload {
        event_type: event_type_for(&txn.transaction_type).to_string(),
        data,
        signature,
    }
}

pub struct WebhookNotifier {
    directory: Arc<dyn MerchantDirectory>,
    deliveries: Arc<dyn WebhookDeliveryStore>,
    sealer: Arc<Sealer>,
    client: reqwest::Client,
}

impl WebhookNotifier {
    pub fn new(
        directory: Arc<dyn MerchantDirectory>,
        deliveries: Arc<dyn WebhookDeliveryStore>,
        sealer: Arc<Sealer>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DELIVERY_TIMEOUT_SECS))
            .user_agent("payment-gateway-webhook/1.0")
            .build()
            .expect("reqwest client builds");

        Self {
            directory,
            deliveries,
            sealer,
            client,
        }
    }

    /// Sign and schedule delivery for a committed transaction. No-op when
    /// the merchant has no webhook URL configured.
    pub async fn enqueue(&self, txn: &Transaction) -> Result<(), ApiError> {
        let directory = Arc::clone(&self.directory);
        let merchant_id = txn.merchant_id;
        let merchant = tokio::task::spawn_blocking(move || directory.merchant_by_id(merchant_id))
            .await
            .map_err(|e| ApiError::internal(anyhow::anyhow!("blocking task: {e}")))??
            .ok_or(ApiError::NotFound("merchant"))?;

        let Some(url) = merchant.webhook_url.clone().filter(|u| !u.is_empty()) else {
            tracing::debug!(merchant_id = %merchant_id, "no webhook URL configured, skipping");
            return Ok(());
        };

        // Currency rides on the wallet; fall back to VND when the lookup
        // fails rather than dropping the event.
        let directory = Arc::clone(&self.directory);
        let wallet_id = txn.wallet_id;
        let currency = tokio::task::spawn_blocking(move || directory.wallet_by_id(wallet_id))
            .await
            .ok()
            .and_then(|r| r.ok().flatten())
            .map(|w| w.currency)
            .unwrap_or_else(|| "VND".to_string());

        let mut secret_key = self.sealer.unseal(&merchant.secret_key_enc).map_err(|e| {
            tracing::error!(merchant_id = %merchant_id, "failed to unseal merchant secret for webhook");
            ApiError::from(e)
        })?;
        let payload = build_payload(txn, &secret_key, &currency);
        secret_key.zeroize();

        let payload_json = serde_json::to_string(&payload).map_err(ApiError::internal)?;
        let log = WebhookDelivery::new(txn.id, txn.merchant_id, url.clone(), payload_json.clone());

        let client = self.client.clone();
        let deliveries = Arc::clone(&self.deliveries);
        tokio::spawn(async move {
            deliver_with_retries(client, deliveries, url, payload_json, log, &RETRY_INTERVALS).await;
        });

        Ok(())
    }
}

/// Drive one delivery to a terminal state: an immediate attempt, then one
/// retry per interval. Every attempt outcome is persisted before sleeping.
pub async fn deliver_with_retries(
    client: reqwest::Client,
    deliveries: Arc<dyn WebhookDeliveryStore>,
    url: String,
    payload_json: String,
    mut log: WebhookDelivery,
    intervals: &[Duration],
) {
    persist(&deliveries, &log, true).await;

    for attempt in 0..=intervals.len() {
        if attempt > 0 {
            tokio::time::sleep(intervals[attempt - 1]).await;
        }
        log.attempt = (attempt + 1) as i32;

        let result = client
            .post(&url)
            .header("Content-Type", "application/json")
            .body(payload_json.clone())
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                log.http_status = Some(i32::from(status));
                if (200..300).contains(&status) {
                    log.status = DeliveryStatus::Delivered.as_str().to_string();
                    log.last_error = None;
                    log.next_retry_at = None;
                    persist(&deliveries, &log, false).await;
                    tracing::info!(
                        tx_id = %log.transaction_id,
                        attempt = log.attempt,
                        status,
                        "webhook delivered"
                    );
                    return;
                }
                log.last_error = Some(format!("HTTP {status}"));
            }
            Err(e) => {
                log.last_error = Some(e.to_string());
            }
        }

        log.next_retry_at = if attempt < intervals.len() {
            chrono::Duration::from_std(intervals[attempt])
                .ok()
                .map(|d| Utc::now() + d)
        } else {
            None
        };
        persist(&deliveries, &log, false).await;
        tracing::warn!(
            tx_id = %log.transaction_id,
            attempt = log.attempt,
            error = log.last_error.as_deref().unwrap_or("unknown"),
            "webhook delivery attempt failed"
        );
    }

    log.status = DeliveryStatus::Failed.as_str().to_string();
    log.next_retry_at = None;
    persist(&deliveries, &log, false).await;
    tracing::error!(tx_id = %log.transaction_id, "webhook retry attempts exhausted");
}

async fn persist(deliveries: &Arc<dyn WebhookDeliveryStore>, log: &WebhookDelivery, create: bool) {
    let store = Arc::clone(deliveries);
    let snapshot = log.clone();
    let result = tokio::task::spawn_blocking(move || {
        if create {
            store.create(&snapshot)
        } else {
            store.save(&snapshot)
        }
    })
    .await;

    match result {
        Ok(Err(e)) => {
            tracing::warn!(log_id = %log.id, error = %e, "failed to persist webhook delivery log")
        }
        Err(e) => tracing::warn!(log_id = %log.id, error = %e, "webhook log persistence task failed"),
        Ok(Ok(())) => {}
    }
}
