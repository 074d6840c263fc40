use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::auth::Claims;
use crate::error::{AppError, AuthError};

/// The claims of the request's validated session token.
///
/// Only available on routes behind `AuthMiddleware`, which inserts the
/// claims into the request extensions. Without them the request is rejected
/// as unauthenticated.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Claims);

impl AuthenticatedUser {
    pub fn id(&self) -> i64 {
        self.0.user_id
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<Claims>().cloned() {
            Some(claims) => ready(Ok(AuthenticatedUser(claims))),
            None => ready(Err(AppError::Auth(AuthError::MissingToken).into())),
        }
    }
}
