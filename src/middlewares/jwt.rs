use std::future::{ready, Future, Ready};
use std::pin::Pin;
use std::rc::Rc;

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header::AUTHORIZATION;
use actix_web::HttpMessage;
use chrono::{DateTime, Duration, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::context::UserInfo;
use crate::core::ports::tokener::{Payload, Tokener};
use crate::error::Error;
use crate::impls::tokener::jwt::JWT;

pub static SESSION_COOKIE: &str = "session";
pub const SESSION_DAYS: i64 = 30;

#[derive(Debug, Deserialize, Serialize)]
pub struct SessionClaim {
    pub user: String,
    pub exp: i64,
}

impl Payload for SessionClaim {
    fn user(&self) -> &str {
        &self.user
    }
}

pub fn session_cookie(tokener: &JWT, uid: i32, now: DateTime<Utc>) -> Result<Cookie<'static>, Error> {
    let claim = SessionClaim {
        user: uid.to_string(),
        exp: (now + Duration::days(SESSION_DAYS)).timestamp(),
    };
    let token = tokener.gen_token(&claim)?;
    Ok(Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::days(SESSION_DAYS))
        .finish())
}

pub fn removal_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").http_only(true).finish();
    cookie.make_removal();
    cookie
}

fn session_token(req: &ServiceRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE) {
        return Some(cookie.value().to_owned());
    }
    let header = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    header.strip_prefix("Bearer ").map(|t| t.trim().to_owned())
}

/// Resolves the session cookie (or a bearer session token) into a
/// `UserInfo` extension. Requests without a valid session pass through
/// anonymous; handlers that need a user reject them via the extractor.
pub struct SessionMiddleware {
    tokener: JWT,
}

impl SessionMiddleware {
    pub fn new(secret: Vec<u8>) -> Self {
        Self { tokener: JWT::new(secret) }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Transform = SessionService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionService {
            tokener: self.tokener.clone(),
            next_service: Rc::new(service),
        }))
    }
}

pub struct SessionService<S> {
    tokener: JWT,
    next_service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SessionService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = actix_web::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    actix_web::dev::forward_ready!(next_service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if let Some(token) = session_token(&req) {
            match <JWT as Tokener<SessionClaim>>::verify_token(&self.tokener, &token) {
                Ok(claim) => match claim.user.parse::<i32>() {
                    Ok(id) => {
                        req.extensions_mut().insert(UserInfo { id });
                    }
                    Err(e) => debug!("malformed session subject: {}", e),
                },
                Err(e) => debug!("rejected session token: {}", e),
            }
        }
        let fut = self.next_service.call(req);
        Box::pin(fut)
    }
}
