//! Top-level error normalization.
//!
//! Every error response leaving the app, whether produced by a handler, an extractor, the
//! auth guard or the router, is rewritten into an [`ErrorBody`] that includes the request
//! path. Successful responses pass through untouched.

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::StatusCode,
    Error, HttpResponse, ResponseError,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::error::{AppError, ErrorBody, INTERNAL_ERROR_MESSAGE};

pub struct ErrorEnvelope;

impl<S, B> Transform<S, ServiceRequest> for ErrorEnvelope
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = ErrorEnvelopeService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(ErrorEnvelopeService { service }))
    }
}

pub struct ErrorEnvelopeService<S> {
    service: S,
}

/// Client-facing message for an error of unknown origin.
fn message_for(err: &Error, status: StatusCode) -> String {
    if let Some(app_err) = err.as_error::<AppError>() {
        return app_err.message();
    }
    if status.is_server_error() {
        log::error!("unhandled error: {}", err);
        return INTERNAL_ERROR_MESSAGE.to_string();
    }
    match status {
        StatusCode::NOT_FOUND => "Not Found".to_string(),
        StatusCode::METHOD_NOT_ALLOWED => "Method Not Allowed".to_string(),
        _ => err.to_string(),
    }
}

fn envelope(status: StatusCode, path: &str, message: String) -> HttpResponse {
    HttpResponse::build(status).json(ErrorBody::new(status, Some(path.to_string()), message))
}

impl<S, B> Service<ServiceRequest> for ErrorEnvelopeService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let request = req.request().clone();
        let path = req.path().to_string();
        let fut = self.service.call(req);

        Box::pin(async move {
            match fut.await {
                Ok(res) => {
                    let status = res.status();
                    let message = match res.response().error() {
                        Some(err) => Some(message_for(err, status)),
                        None if status == StatusCode::NOT_FOUND => {
                            Some("Not Found".to_string())
                        }
                        None => None,
                    };

                    match message {
                        Some(message) => {
                            let response = envelope(status, &path, message);
                            Ok(res.into_response(response).map_into_right_body())
                        }
                        None => Ok(res.map_into_left_body()),
                    }
                }
                Err(err) => {
                    let status = err.as_response_error().status_code();
                    let response = envelope(status, &path, message_for(&err, status));
                    Ok(ServiceResponse::new(request, response).map_into_right_body())
                }
            }
        })
    }
}
