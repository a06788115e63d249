use actix_web::web::{Data, Json, Path, Query};
use actix_web::HttpResponse;
use serde::Deserialize;

use crate::context::UserInfo;
use crate::core::models::organization::{Insert, Member, Membership, Organization, Role, Update};
use crate::core::models::post::PostDetail;
use crate::core::pagination::Page;
use crate::core::ports::repository::Manager;
use crate::core::services::organization;
use crate::error::Error;
use crate::request::PageParams;

#[derive(Debug, Deserialize)]
pub struct RoleChange {
    pub role: Role,
}

pub async fn list<M: Manager>(me: UserInfo, Query(params): Query<PageParams>, manager: Data<M>) -> Result<Json<Page<Membership>>, Error> {
    let page = params.page()?;
    Ok(Json(organization::list(&mut manager.db().await?, me.id, &page).await?))
}

pub async fn create<M: Manager>(me: UserInfo, Json(body): Json<Insert>, manager: Data<M>) -> Result<HttpResponse, Error> {
    let org = organization::create(manager.tx().await?, me.id, body).await?;
    Ok(HttpResponse::Created().json(org))
}

pub async fn detail<M: Manager>(me: UserInfo, org_id: Path<(i32,)>, manager: Data<M>) -> Result<Json<Organization>, Error> {
    let org_id = org_id.into_inner().0;
    Ok(Json(organization::detail(&mut manager.db().await?, org_id, me.id).await?))
}

pub async fn update<M: Manager>(me: UserInfo, org_id: Path<(i32,)>, Json(body): Json<Update>, manager: Data<M>) -> Result<Json<Organization>, Error> {
    let org_id = org_id.into_inner().0;
    Ok(Json(organization::update(&mut manager.db().await?, org_id, me.id, body).await?))
}

pub async fn delete<M: Manager>(me: UserInfo, org_id: Path<(i32,)>, manager: Data<M>) -> Result<HttpResponse, Error> {
    let org_id = org_id.into_inner().0;
    organization::delete(&mut manager.db().await?, org_id, me.id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn members<M: Manager>(me: UserInfo, org_id: Path<(i32,)>, Query(params): Query<PageParams>, manager: Data<M>) -> Result<Json<Page<Member>>, Error> {
    let org_id = org_id.into_inner().0;
    let page = params.page()?;
    Ok(Json(organization::members(&mut manager.db().await?, org_id, me.id, &page).await?))
}

pub async fn set_role<M: Manager>(me: UserInfo, path: Path<(i32, i32)>, Json(body): Json<RoleChange>, manager: Data<M>) -> Result<HttpResponse, Error> {
    let (org_id, user_id) = path.into_inner();
    organization::set_role(&mut manager.db().await?, org_id, me.id, user_id, body.role).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn remove_member<M: Manager>(me: UserInfo, path: Path<(i32, i32)>, manager: Data<M>) -> Result<HttpResponse, Error> {
    let (org_id, user_id) = path.into_inner();
    organization::remove_member(&mut manager.db().await?, org_id, me.id, user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn posts<M: Manager>(me: UserInfo, org_id: Path<(i32,)>, Query(params): Query<PageParams>, manager: Data<M>) -> Result<Json<Page<PostDetail>>, Error> {
    let org_id = org_id.into_inner().0;
    let page = params.page()?;
    Ok(Json(organization::posts(&mut manager.db().await?, org_id, me.id, &page).await?))
}
