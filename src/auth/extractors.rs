use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

use crate::auth::token::Claims;
use crate::error::AppError;

/// Claims of the caller, as verified by `AuthMiddleware`.
///
/// Only meaningful on routes wrapped by the guard; elsewhere extraction fails with 401.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Claims);

impl AuthenticatedUser {
    pub fn id(&self) -> i32 {
        self.0.sub
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<Claims>().cloned() {
            Some(claims) => ready(Ok(AuthenticatedUser(claims))),
            None => {
                let err = AppError::Unauthorized("Missing token".to_string());
                ready(Err(err.into()))
            }
        }
    }
}
