//! Merchant self-management endpoints. Bearer-gated.

use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::error::ApiError;
use crate::middleware::merchant_context;
use crate::response;
use crate::services::MerchantService;

/// GET /api/v1/merchants/me
pub async fn get_profile(
    req: HttpRequest,
    merchants: web::Data<MerchantService>,
) -> Result<HttpResponse, ApiError> {
    let ctx = merchant_context(&req)?;
    let profile = merchants.get_profile(ctx.merchant_id).await?;
    Ok(response::ok(profile))
}

#[derive(Debug, Deserialize)]
pub struct UpdateWebhookBody {
    /// `null` clears the endpoint.
    pub webhook_url: Option<String>,
}

/// PUT /api/v1/merchants/me/webhook
pub async fn update_webhook(
    req: HttpRequest,
    body: web::Json<UpdateWebhookBody>,
    merchants: web::Data<MerchantService>,
) -> Result<HttpResponse, ApiError> {
    let ctx = merchant_context(&req)?;
    merchants
        .update_webhook_url(ctx.merchant_id, body.into_inner().webhook_url)
        .await?;
    Ok(response::ok(serde_json::json!({ "updated": true })))
}

/// POST /api/v1/merchants/me/rotate-keys
pub async fn rotate_keys(
    req: HttpRequest,
    merchants: web::Data<MerchantService>,
) -> Result<HttpResponse, ApiError> {
    let ctx = merchant_context(&req)?;
    let keys = merchants.rotate_keys(ctx.merchant_id).await?;
    Ok(response::ok(keys))
}
