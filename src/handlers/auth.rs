use actix_web::web::{Data, Json, Query};
use actix_web::HttpResponse;
use chrono::Utc;
use serde::Deserialize;

use crate::config::Config;
use crate::context::{Tokeners, UserInfo};
use crate::core::models::user::{Me, Patch};
use crate::core::ports::mailer::Mailer;
use crate::core::ports::repository::Manager;
use crate::core::services::auth::{self, Login, Signup};
use crate::core::services::user;
use crate::error::Error;
use crate::middlewares::jwt::{removal_cookie, session_cookie};

#[derive(Debug, Deserialize)]
pub struct MagicLink {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    pub token: String,
}

async fn signed_in<M: Manager>(manager: &M, tokeners: &Tokeners, uid: i32) -> Result<HttpResponse, Error> {
    let me = user::me(&mut manager.db().await?, uid).await?;
    let cookie = session_cookie(&tokeners.session, uid, Utc::now())?;
    Ok(HttpResponse::Ok().cookie(cookie).json(me))
}

pub async fn signup<M: Manager, Ml: Mailer>(
    Json(body): Json<Signup>,
    manager: Data<M>,
    mailer: Data<Ml>,
    config: Data<Config>,
) -> Result<HttpResponse, Error> {
    let uid = auth::signup(manager.tx().await?, mailer.get_ref(), &config.public_url, body, Utc::now()).await?;
    let me = user::me(&mut manager.db().await?, uid).await?;
    Ok(HttpResponse::Created().json(me))
}

pub async fn login<M: Manager>(Json(body): Json<Login>, manager: Data<M>, tokeners: Data<Tokeners>) -> Result<HttpResponse, Error> {
    let uid = auth::login(&mut manager.db().await?, body).await?;
    signed_in(manager.get_ref(), &tokeners, uid).await
}

pub async fn logout() -> HttpResponse {
    HttpResponse::NoContent().cookie(removal_cookie()).finish()
}

pub async fn magic_link<M: Manager, Ml: Mailer>(
    Json(body): Json<MagicLink>,
    manager: Data<M>,
    mailer: Data<Ml>,
    config: Data<Config>,
) -> Result<HttpResponse, Error> {
    auth::request_magic_link(&mut manager.db().await?, mailer.get_ref(), &config.public_url, &body.email, Utc::now()).await?;
    Ok(HttpResponse::Accepted().finish())
}

pub async fn verify<M: Manager>(Query(params): Query<VerifyParams>, manager: Data<M>, tokeners: Data<Tokeners>) -> Result<HttpResponse, Error> {
    let uid = auth::verify(manager.tx().await?, &params.token, Utc::now()).await?;
    signed_in(manager.get_ref(), &tokeners, uid).await
}

pub async fn me<M: Manager>(me: UserInfo, manager: Data<M>) -> Result<Json<Me>, Error> {
    Ok(Json(user::me(&mut manager.db().await?, me.id).await?))
}

pub async fn update_me<M: Manager>(me: UserInfo, Json(patch): Json<Patch>, manager: Data<M>) -> Result<Json<Me>, Error> {
    Ok(Json(user::update_me(&mut manager.db().await?, me.id, patch).await?))
}
