//! Merchant API: payments and refunds. Both routes sit behind `HmacAuth`.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::error::ApiError;
use crate::handlers::TransactionResponse;
use crate::middleware::{client_ip, merchant_context};
use crate::response;
use crate::services::{LedgerService, PaymentRequest, RefundRequest, WebhookNotifier};

#[derive(Debug, Deserialize)]
pub struct PaymentBody {
    pub reference_id: String,
    pub amount: i64,
    pub currency: String,
    pub extra_data: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefundBody {
    pub original_reference_id: String,
    pub amount: Option<i64>,
    pub reason: String,
}

/// POST /api/v1/payments
pub async fn process_payment(
    req: HttpRequest,
    body: web::Json<PaymentBody>,
    ledger: web::Data<LedgerService>,
    notifier: web::Data<WebhookNotifier>,
) -> Result<HttpResponse, ApiError> {
    let ctx = merchant_context(&req)?;
    let body = body.into_inner();

    let txn = ledger
        .process_payment(PaymentRequest {
            merchant_id: ctx.merchant_id,
            reference_id: body.reference_id,
            amount: body.amount,
            currency: body.currency,
            signature: ctx.signature.unwrap_or_default(),
            client_ip: client_ip(&req),
            extra_data: body.extra_data,
        })
        .await?;

    if let Err(e) = notifier.enqueue(&txn).await {
        tracing::warn!(tx_id = %txn.id, error = %e, "webhook enqueue failed");
    }

    Ok(response::created(TransactionResponse::from(&txn)))
}

/// POST /api/v1/payments/refund
pub async fn process_refund(
    req: HttpRequest,
    body: web::Json<RefundBody>,
    ledger: web::Data<LedgerService>,
    notifier: web::Data<WebhookNotifier>,
) -> Result<HttpResponse, ApiError> {
    let ctx = merchant_context(&req)?;
    let body = body.into_inner();

    let txn = ledger
        .process_refund(RefundRequest {
            merchant_id: ctx.merchant_id,
            original_reference_id: body.original_reference_id,
            amount: body.amount,
            reason: body.reason,
            signature: ctx.signature.unwrap_or_default(),
            client_ip: client_ip(&req),
        })
        .await?;

    if let Err(e) = notifier.enqueue(&txn).await {
        tracing::warn!(tx_id = %txn.id, error = %e, "webhook enqueue failed");
    }

    Ok(response::created(TransactionResponse::from(&txn)))
}
