use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::sync::Arc;

use crate::auth::token::TokenService;
use crate::error::AppError;

/// Bearer-token guard. Wrap a scope or resource with it; requests without a valid access
/// token are rejected with 401 before the handler runs, and valid claims are stored in the
/// request extensions for [`crate::auth::AuthenticatedUser`].
pub struct AuthMiddleware {
    tokens: Arc<TokenService>,
}

impl AuthMiddleware {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            tokens: self.tokens.clone(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    tokens: Arc<TokenService>,
}

fn bearer_token(req: &ServiceRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let verified = match bearer_token(&req) {
            Some(token) => self.tokens.verify_access(token),
            None => Err(AppError::Unauthorized("Missing token".into())),
        };

        match verified {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                let fut = self.service.call(req);
                Box::pin(fut)
            }
            Err(app_err) => Box::pin(async move { Err(app_err.into()) }),
        }
    }
}
