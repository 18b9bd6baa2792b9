//! Dashboard wallet endpoints: top-up and balance. Bearer-gated.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::handlers::TransactionResponse;
use crate::middleware::merchant_context;
use crate::response;
use crate::services::{LedgerService, ReportingService, TopupRequest, WebhookNotifier};

#[derive(Debug, Deserialize)]
pub struct TopupBody {
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Serialize)]
pub struct WalletBalanceResponse {
    pub balance: i64,
    pub currency: String,
}

/// POST /api/v1/wallets/topup
pub async fn topup(
    req: HttpRequest,
    body: web::Json<TopupBody>,
    ledger: web::Data<LedgerService>,
    notifier: web::Data<WebhookNotifier>,
) -> Result<HttpResponse, ApiError> {
    let ctx = merchant_context(&req)?;
    let body = body.into_inner();

    let txn = ledger
        .process_topup(TopupRequest {
            merchant_id: ctx.merchant_id,
            amount: body.amount,
            currency: body.currency,
        })
        .await?;

    if let Err(e) = notifier.enqueue(&txn).await {
        tracing::warn!(tx_id = %txn.id, error = %e, "webhook enqueue failed");
    }

    Ok(response::created(TransactionResponse::from(&txn)))
}

/// GET /api/v1/wallets/balance
pub async fn balance(
    req: HttpRequest,
    reporting: web::Data<ReportingService>,
) -> Result<HttpResponse, ApiError> {
    let ctx = merchant_context(&req)?;
    let (balance, currency) = reporting.wallet_balance(ctx.merchant_id).await?;

    Ok(response::ok(WalletBalanceResponse { balance, currency }))
}
