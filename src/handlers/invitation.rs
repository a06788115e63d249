use actix_web::web::{Data, Json, Path, Query};
use actix_web::HttpResponse;
use chrono::Utc;
use serde::Deserialize;

use crate::config::Config;
use crate::context::UserInfo;
use crate::core::models::invitation::{Create, Invitation};
use crate::core::models::organization::Organization;
use crate::core::ports::mailer::Mailer;
use crate::core::ports::repository::Manager;
use crate::core::services::invitation;
use crate::error::Error;

#[derive(Debug, Deserialize)]
pub struct Accept {
    pub token: String,
}

pub async fn create<M: Manager, Ml: Mailer>(
    me: UserInfo,
    org_id: Path<(i32,)>,
    Json(body): Json<Create>,
    manager: Data<M>,
    mailer: Data<Ml>,
    config: Data<Config>,
) -> Result<HttpResponse, Error> {
    let org_id = org_id.into_inner().0;
    let inv = invitation::create(&mut manager.db().await?, mailer.get_ref(), &config.public_url, org_id, me.id, body, Utc::now()).await?;
    Ok(HttpResponse::Created().json(inv))
}

pub async fn list<M: Manager>(me: UserInfo, org_id: Path<(i32,)>, manager: Data<M>) -> Result<Json<Vec<Invitation>>, Error> {
    let org_id = org_id.into_inner().0;
    Ok(Json(invitation::list(&mut manager.db().await?, org_id, me.id).await?))
}

pub async fn revoke<M: Manager>(me: UserInfo, path: Path<(i32, i32)>, manager: Data<M>) -> Result<HttpResponse, Error> {
    let (org_id, invitation_id) = path.into_inner();
    invitation::revoke(&mut manager.db().await?, org_id, me.id, invitation_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn accept<M: Manager>(me: UserInfo, Json(body): Json<Accept>, manager: Data<M>) -> Result<Json<Organization>, Error> {
    Ok(Json(invitation::accept(manager.tx().await?, me.id, &body.token, Utc::now()).await?))
}

/// Target of the link in the invitation email.
pub async fn accept_link<M: Manager>(me: UserInfo, Query(params): Query<Accept>, manager: Data<M>) -> Result<Json<Organization>, Error> {
    Ok(Json(invitation::accept(manager.tx().await?, me.id, &params.token, Utc::now()).await?))
}
