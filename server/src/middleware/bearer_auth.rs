//! Bearer-token gate for the dashboard routes.

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, HttpMessage};
use futures_util::future::LocalBoxFuture;
use gateway_crypto_core::TokenSigner;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;

use crate::error::ApiError;
use crate::middleware::MerchantContext;

pub struct BearerAuth {
    signer: Arc<TokenSigner>,
}

impl BearerAuth {
    pub fn new(signer: Arc<TokenSigner>) -> Self {
        Self { signer }
    }
}

impl<S, B> Transform<S, ServiceRequest> for BearerAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = BearerAuthService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(BearerAuthService {
            service: Rc::new(service),
            signer: Arc::clone(&self.signer),
        }))
    }
}

pub struct BearerAuthService<S> {
    service: Rc<S>,
    signer: Arc<TokenSigner>,
}

impl<S, B> Service<ServiceRequest> for BearerAuthService<S>
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
        let signer = Arc::clone(&self.signer);

        Box::pin(async move {
            let token = req
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .map(str::to_string)
                .ok_or(ApiError::InvalidToken)?;

            let claims = signer.validate(&token).map_err(|_| ApiError::InvalidToken)?;

            req.extensions_mut().insert(MerchantContext {
                merchant_id: claims.merchant_id,
                access_key: claims.access_key,
                signature: None,
            });

            svc.call(req).await
        })
    }
}
