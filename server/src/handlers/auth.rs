//! Public endpoints: merchant registration and dashboard login.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::response;
use crate::services::AuthService;

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    pub username: String,
    pub password: String,
    pub merchant_name: String,
    pub webhook_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub merchant_id: String,
    pub access_key: String,
    pub secret_key: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expiry: i64,
}

/// POST /api/v1/auth/register
pub async fn register(
    body: web::Json<RegisterBody>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    if body.merchant_name.trim().is_empty() || body.merchant_name.len() > 100 {
        return Err(ApiError::Validation(
            "merchant_name must be between 1 and 100 characters".into(),
        ));
    }

    let outcome = auth
        .register(
            body.username,
            body.password,
            body.merchant_name,
            body.webhook_url,
        )
        .await?;

    Ok(response::created(RegisterResponse {
        merchant_id: outcome.merchant_id.to_string(),
        access_key: outcome.access_key,
        secret_key: outcome.secret_key,
    }))
}

/// POST /api/v1/auth/login
pub async fn login(
    body: web::Json<LoginBody>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, ApiError> {
    let body = body.into_inner();
    let (token, expires_at) = auth.login(body.username, body.password).await?;

    Ok(response::ok(LoginResponse {
        token,
        expiry: expires_at.timestamp(),
    }))
}
