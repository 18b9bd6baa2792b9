//! Dashboard reporting endpoints. Bearer-gated.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::handlers::TransactionResponse;
use crate::middleware::merchant_context;
use crate::models::{TransactionListParams, TransactionStatus, TransactionType};
use crate::response;
use crate::services::ReportingService;

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    #[serde(default)]
    pub period: String,
}

/// GET /api/v1/dashboard/stats
pub async fn stats(
    req: HttpRequest,
    query: web::Query<StatsQuery>,
    reporting: web::Data<ReportingService>,
) -> Result<HttpResponse, ApiError> {
    let ctx = merchant_context(&req)?;
    let stats = reporting
        .dashboard_stats(ctx.merchant_id, &query.period)
        .await?;
    Ok(response::ok(stats))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    /// Unix seconds, inclusive.
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TransactionListResponse {
    pub items: Vec<TransactionResponse>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

fn parse_status(raw: &str) -> Result<TransactionStatus, ApiError> {
    match raw {
        "PENDING" => Ok(TransactionStatus::Pending),
        "SUCCESS" => Ok(TransactionStatus::Success),
        "FAILED" => Ok(TransactionStatus::Failed),
        "REVERSED" => Ok(TransactionStatus::Reversed),
        other => Err(ApiError::Validation(format!("unknown status '{other}'"))),
    }
}

fn parse_type(raw: &str) -> Result<TransactionType, ApiError> {
    match raw {
        "PAYMENT" => Ok(TransactionType::Payment),
        "REFUND" => Ok(TransactionType::Refund),
        "TOPUP" => Ok(TransactionType::Topup),
        other => Err(ApiError::Validation(format!(
            "unknown transaction type '{other}'"
        ))),
    }
}

fn from_unix(ts: i64) -> Result<DateTime<Utc>, ApiError> {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .ok_or_else(|| ApiError::Validation("timestamp out of range".into()))
}

/// GET /api/v1/transactions
pub async fn list_transactions(
    req: HttpRequest,
    query: web::Query<ListQuery>,
    reporting: web::Data<ReportingService>,
) -> Result<HttpResponse, ApiError> {
    let ctx = merchant_context(&req)?;
    let query = query.into_inner();

    let page = query.page.unwrap_or(1).max(1);
    let page_size = query.page_size.unwrap_or(20).clamp(1, 100);

    let params = TransactionListParams {
        merchant_id: ctx.merchant_id,
        status: query.status.as_deref().map(parse_status).transpose()?,
        transaction_type: query
            .transaction_type
            .as_deref()
            .map(parse_type)
            .transpose()?,
        from: query.from.map(from_unix).transpose()?,
        to: query.to.map(from_unix).transpose()?,
        page,
        page_size,
    };

    let (items, total) = reporting.list_transactions(params).await?;
    let total_pages = (total + page_size - 1) / page_size;

    Ok(response::ok(TransactionListResponse {
        items: items.iter().map(TransactionResponse::from).collect(),
        total,
        page,
        page_size,
        total_pages,
    }))
}
