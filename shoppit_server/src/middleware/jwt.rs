//! JWT validation middleware.
//!
//! Wraps the `/api` scope. Every request must carry `Authorization: Bearer <token>`; the token is validated
//! against the configured secret and the decoded [`JwtClaims`] are stored in the request extensions, where the
//! `FromRequest` impl on `JwtClaims` and the ACL middleware pick them up.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
    HttpMessage,
};
use futures::future::LocalBoxFuture;
use log::{debug, trace};

use crate::{
    auth::{bearer_token, validate_token},
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

pub struct JwtMiddlewareFactory {
    config: AuthConfig,
}

impl JwtMiddlewareFactory {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = JwtMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtMiddlewareService { config: self.config.clone(), service: Rc::new(service) }))
    }
}

pub struct JwtMiddlewareService<S> {
    config: AuthConfig,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let config = self.config.clone();
        Box::pin(async move {
            trace!("🔐️ Validating access token for {}", req.path());
            let header = req
                .headers()
                .get("Authorization")
                .and_then(|v| v.to_str().ok())
                .ok_or_else(|| ServerError::from(AuthError::MissingToken))?;
            let token = bearer_token(header).map_err(ServerError::from)?;
            let claims = validate_token(token, &config).map_err(|e| {
                debug!("🔐️ Token validation failed: {e}");
                ServerError::from(e)
            })?;
            trace!("🔐️ Request authenticated for customer {}", claims.sub);
            req.extensions_mut().insert(claims);
            service.call(req).await
        })
    }
}
