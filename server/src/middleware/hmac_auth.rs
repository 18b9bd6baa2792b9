//! Request authenticity gate for the merchant API.
//!
//! Strict order: headers -> timestamp window -> merchant lookup + status ->
//! single-use nonce claim -> HMAC over the canonical string. The body is
//! read once here and replayed to the handler unchanged. The merchant's
//! plaintext secret exists only on this request's stack between unseal and
//! verify.

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{web, Error, HttpMessage};
use futures_util::future::LocalBoxFuture;
use futures_util::StreamExt;
use gateway_crypto_core::{canonical_string, Sealer};
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;
use zeroize::Zeroize;

use crate::error::ApiError;
use crate::middleware::MerchantContext;
use crate::ports::{KvStore, MerchantDirectory};

pub const HEADER_ACCESS_KEY: &str = "X-Merchant-Access-Key";
pub const HEADER_SIGNATURE: &str = "X-Signature";
pub const HEADER_TIMESTAMP: &str = "X-Timestamp";
pub const HEADER_NONCE: &str = "X-Nonce";

/// Maximum allowed clock drift between merchant and gateway.
pub const MAX_TIMESTAMP_DRIFT_SECS: i64 = 60;

/// Nonces stay claimed for twice the timestamp window.
pub const NONCE_TTL: Duration = Duration::from_secs(120);

pub struct HmacAuth {
    directory: Arc<dyn MerchantDirectory>,
    kv: Arc<dyn KvStore>,
    sealer: Arc<Sealer>,
}

impl HmacAuth {
    pub fn new(
        directory: Arc<dyn MerchantDirectory>,
        kv: Arc<dyn KvStore>,
        sealer: Arc<Sealer>,
    ) -> Self {
        Self {
            directory,
            kv,
            sealer,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for HmacAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = HmacAuthService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(HmacAuthService {
            service: Rc::new(service),
            directory: Arc::clone(&self.directory),
            kv: Arc::clone(&self.kv),
            sealer: Arc::clone(&self.sealer),
        }))
    }
}

pub struct HmacAuthService<S> {
    service: Rc<S>,
    directory: Arc<dyn MerchantDirectory>,
    kv: Arc<dyn KvStore>,
    sealer: Arc<Sealer>,
}

fn header_string(req: &ServiceRequest, name: &str) -> Option<String> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl<S, B> Service<ServiceRequest> for HmacAuthService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let svc = Rc::clone(&self.service);
        let directory = Arc::clone(&self.directory);
        let kv = Arc::clone(&self.kv);
        let sealer = Arc::clone(&self.sealer);

        Box::pin(async move {
            // 1. All four headers must be present.
            let (access_key, signature, timestamp_raw, nonce) = match (
                header_string(&req, HEADER_ACCESS_KEY),
                header_string(&req, HEADER_SIGNATURE),
                header_string(&req, HEADER_TIMESTAMP),
                header_string(&req, HEADER_NONCE),
            ) {
                (Some(a), Some(s), Some(t), Some(n)) => (a, s, t, n),
                _ => return Err(ApiError::InvalidAccessKey.into()),
            };

            // 2. Timestamp window.
            let timestamp: i64 = timestamp_raw
                .parse()
                .map_err(|_| ApiError::TimestampExpired)?;
            let now = chrono::Utc::now().timestamp();
            if (now - timestamp).abs() > MAX_TIMESTAMP_DRIFT_SECS {
                return Err(ApiError::TimestampExpired.into());
            }

            // 3. Merchant lookup and status.
            let lookup_dir = Arc::clone(&directory);
            let lookup_key = access_key.clone();
            let merchant = web::block(move || lookup_dir.merchant_by_access_key(&lookup_key))
                .await
                .map_err(|e| ApiError::internal(anyhow::anyhow!("blocking task: {e}")))??
                .ok_or(ApiError::InvalidAccessKey)?;
            if !merchant.is_active() {
                return Err(ApiError::MerchantSuspended.into());
            }

            // 4. Single-use nonce claim. A KV transport error degrades to
            // allow (signature verification still stands between the caller
            // and the ledger); a lost claim hard-fails.
            let nonce_key = format!("nonce:{}:{}", merchant.id, nonce);
            match kv.claim_if_absent(&nonce_key, NONCE_TTL).await {
                Ok(true) => {}
                Ok(false) => return Err(ApiError::NonceUsed.into()),
                Err(e) => {
                    tracing::warn!(error = %e, "nonce store unavailable, allowing request");
                }
            }

            // 5. Read the body once, replay it to the handler.
            let mut payload = req.take_payload();
            let mut body = web::BytesMut::new();
            while let Some(chunk) = payload.next().await {
                let chunk = chunk
                    .map_err(|e| ApiError::Validation(format!("cannot read request body: {e}")))?;
                body.extend_from_slice(&chunk);
            }
            let body = body.freeze();

            let (_, mut replay) = actix_http::h1::Payload::create(true);
            replay.unread_data(body.clone());
            req.set_payload(actix_web::dev::Payload::from(replay));

            // 6. Recompute the MAC with the unsealed secret.
            let body_str = std::str::from_utf8(&body)
                .map_err(|_| ApiError::Validation("request body must be UTF-8".into()))?;
            let canonical =
                canonical_string(req.method().as_str(), req.path(), timestamp, &nonce, body_str);

            let mut secret_key = sealer.unseal(&merchant.secret_key_enc).map_err(|e| {
                tracing::error!(merchant_id = %merchant.id, "failed to unseal merchant secret");
                ApiError::from(e)
            })?;
            let verified = gateway_crypto_core::verify(&secret_key, &canonical, &signature);
            secret_key.zeroize();

            if !verified {
                return Err(ApiError::InvalidSignature.into());
            }

            req.extensions_mut().insert(MerchantContext {
                merchant_id: merchant.id,
                access_key: merchant.access_key.clone(),
                signature: Some(signature),
            });

            svc.call(req).await
        })
    }
}
