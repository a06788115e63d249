use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpMessage, HttpRequest};

use crate::error::Error;
use crate::impls::tokener::jwt::JWT;

/// The signed-in user, put into request extensions by the session middleware.
#[derive(Debug, Clone)]
pub struct UserInfo {
    pub id: i32,
}

impl FromRequest for UserInfo {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;
    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<Self>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(Error::Unauthenticated)),
        }
    }
}

/// Best-effort client address, honoring `X-Forwarded-For`.
#[derive(Debug, Clone)]
pub struct ClientIp(pub String);

impl FromRequest for ClientIp {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;
    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let info = req.connection_info();
        let ip = info.realip_remote_addr().unwrap_or("unknown");
        let ip = match ip.parse::<std::net::SocketAddr>() {
            Ok(addr) => addr.ip().to_string(),
            Err(_) => ip.to_owned(),
        };
        ready(Ok(ClientIp(ip)))
    }
}

/// Signers for the two token kinds the server issues.
#[derive(Debug, Clone)]
pub struct Tokeners {
    pub session: JWT,
    pub widget: JWT,
}
