use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};
use log::debug;

use crate::auth::token::{bearer_token, Claims};
use crate::error::{AppError, AuthError};
use crate::state::AppState;

/// Paths reachable without a session token.
const PUBLIC_PATHS: [&str; 3] = ["/health", "/api/users/register", "/api/users/login"];

/// Validates the `Authorization` header with the shared `TokenService` and
/// stores the resulting `Claims` in the request extensions.
pub struct AuthMiddleware;

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
        ready(Ok(AuthMiddlewareService { service }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
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
        if PUBLIC_PATHS.contains(&req.path()) {
            return Box::pin(self.service.call(req));
        }

        match authenticate(&req) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                Box::pin(self.service.call(req))
            }
            Err(err) => {
                debug!("Rejected request to {}: {}", req.path(), err);
                let err: Error = err.into();
                Box::pin(async move { Err(err) })
            }
        }
    }
}

fn authenticate(req: &ServiceRequest) -> Result<Claims, AppError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(bearer_token)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)?;

    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("Application state is not configured".into()))?;

    Ok(state.tokens.validate(token)?)
}
