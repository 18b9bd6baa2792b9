//! Fixed-window rate limiting over the KV counter.
//!
//! Windows are discrete (`now / window`), keyed per endpoint group and per
//! caller. The caller identity is the merchant access-key header when one is
//! sent, else the authenticated merchant id, falling back to the client IP
//! only for unauthenticated routes. When the counter store is unreachable
//! the limiter fails open; the authenticity pipeline is the gate that must
//! not degrade silently, not this one.

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::{Error, HttpMessage};
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ApiError;
use crate::middleware::hmac_auth::HEADER_ACCESS_KEY;
use crate::middleware::MerchantContext;
use crate::ports::KvStore;

/// Limits per endpoint group.
fn default_rule(group: &str) -> (i64, Duration) {
    match group {
        "payments" => (100, Duration::from_secs(60)),
        "payments_refund" => (30, Duration::from_secs(60)),
        "auth_login" => (10, Duration::from_secs(60)),
        "auth_register" => (5, Duration::from_secs(3600)),
        "dashboard" => (60, Duration::from_secs(60)),
        "wallets_topup" => (20, Duration::from_secs(60)),
        _ => (60, Duration::from_secs(60)),
    }
}

pub struct RateLimit {
    kv: Arc<dyn KvStore>,
    group: &'static str,
    max_requests: i64,
    window: Duration,
}

impl RateLimit {
    pub fn new(
        kv: Arc<dyn KvStore>,
        group: &'static str,
        max_requests: i64,
        window: Duration,
    ) -> Self {
        Self {
            kv,
            group,
            max_requests,
            window,
        }
    }

    /// Limiter with the group's default rule.
    pub fn for_group(kv: Arc<dyn KvStore>, group: &'static str) -> Self {
        let (max_requests, window) = default_rule(group);
        Self::new(kv, group, max_requests, window)
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimit
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitService {
            service: Rc::new(service),
            kv: Arc::clone(&self.kv),
            group: self.group,
            max_requests: self.max_requests,
            window: self.window,
        }))
    }
}

pub struct RateLimitService<S> {
    service: Rc<S>,
    kv: Arc<dyn KvStore>,
    group: &'static str,
    max_requests: i64,
    window: Duration,
}

/// Rate-limit key source: access-key header, then authenticated merchant,
/// then client IP.
fn extract_identifier(req: &ServiceRequest) -> String {
    if let Some(access_key) = req
        .headers()
        .get(HEADER_ACCESS_KEY)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        return access_key.to_string();
    }
    if let Some(ctx) = req.extensions().get::<MerchantContext>() {
        return ctx.merchant_id.to_string();
    }
    req.connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string()
}

impl<S, B> Service<ServiceRequest> for RateLimitService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = Rc::clone(&self.service);
        let kv = Arc::clone(&self.kv);
        let group = self.group;
        let max_requests = self.max_requests;
        let window = self.window;

        let identifier = extract_identifier(&req);

        Box::pin(async move {
            let window_secs = window.as_secs().max(1) as i64;
            let window_id = chrono::Utc::now().timestamp() / window_secs;
            let key = format!("ratelimit:{group}:{identifier}:{window_id}");

            let count = match kv.incr_with_ttl(&key, window).await {
                Ok(count) if count > max_requests => {
                    tracing::warn!(group, identifier = %identifier, count, "rate limit exceeded");
                    return Err(ApiError::RateLimitExceeded.into());
                }
                Ok(count) => Some(count),
                Err(e) => {
                    tracing::warn!(group, error = %e, "rate limit store unavailable, failing open");
                    None
                }
            };

            let mut res = svc.call(req).await?;

            if let Some(count) = count {
                let remaining = (max_requests - count).max(0);
                let reset_at = (window_id + 1) * window_secs;
                let headers = res.headers_mut();
                if let Ok(v) = HeaderValue::from_str(&max_requests.to_string()) {
                    headers.insert(HeaderName::from_static("x-ratelimit-limit"), v);
                }
                if let Ok(v) = HeaderValue::from_str(&remaining.to_string()) {
                    headers.insert(HeaderName::from_static("x-ratelimit-remaining"), v);
                }
                if let Ok(v) = HeaderValue::from_str(&reset_at.to_string()) {
                    headers.insert(HeaderName::from_static("x-ratelimit-reset"), v);
                }
            }

            Ok(res)
        })
    }
}
