// Session gate for page and upload endpoints

use actix_web::{
    body::{BoxBody, EitherBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpMessage, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};

use crate::api::session::{SessionClaims, SessionKeys, SESSION_COOKIE};

/// Paths reachable without a session.
const PUBLIC_PATHS: [&str; 2] = ["/login", "/health"];

/// Middleware that requires a valid session cookie and redirects to `/login`
/// otherwise. Valid claims are stored in the request extensions.
pub struct Auth {
    keys: SessionKeys,
}

impl Auth {
    pub fn new(keys: SessionKeys) -> Self {
        Self { keys }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Auth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddleware {
            service,
            keys: self.keys.clone(),
        }))
    }
}

pub struct AuthMiddleware<S> {
    service: S,
    keys: SessionKeys,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B, BoxBody>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if PUBLIC_PATHS.contains(&req.path()) {
            let fut = self.service.call(req);
            return Box::pin(async move {
                let res = fut.await?;
                Ok(res.map_into_left_body())
            });
        }

        if let Some(claims) = session_from_request(&req, &self.keys) {
            req.extensions_mut().insert(claims);
            let fut = self.service.call(req);
            return Box::pin(async move {
                let res = fut.await?;
                Ok(res.map_into_left_body())
            });
        }

        tracing::debug!(path = %req.path(), "no valid session; redirecting to login");
        Box::pin(async move {
            let response = HttpResponse::Found()
                .insert_header((header::LOCATION, "/login"))
                .finish()
                .map_into_right_body();
            Ok(req.into_response(response))
        })
    }
}

fn session_from_request(req: &ServiceRequest, keys: &SessionKeys) -> Option<SessionClaims> {
    let cookie = req.cookie(SESSION_COOKIE)?;
    match keys.verify(cookie.value()) {
        Ok(claims) => Some(claims),
        Err(e) => {
            tracing::debug!(error = %e, "session cookie rejected");
            None
        }
    }
}
