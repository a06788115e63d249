use actix_web::web::{Data, Json, Path, Query};
use actix_web::HttpResponse;
use serde::Deserialize;

use crate::context::{ClientIp, UserInfo};
use crate::core::models::comment::{Comment, Create as CommentCreate};
use crate::core::models::post::{Create, PostDetail, Update};
use crate::core::models::reaction::{BookmarkStatus, LikeStatus};
use crate::core::pagination::Page;
use crate::core::ports::repository::Manager;
use crate::core::services::post::FeedFilter;
use crate::core::services::widget::WidgetCache;
use crate::core::services::{comment, post, reaction};
use crate::error::Error;
use crate::request::PageParams;

#[derive(Debug, Deserialize)]
pub struct FeedParams {
    pub cursor: Option<String>,
    pub size: Option<i64>,
    pub author_id: Option<i32>,
    #[serde(default)]
    pub following: bool,
}

pub async fn feed<M: Manager>(me: Option<UserInfo>, Query(params): Query<FeedParams>, manager: Data<M>) -> Result<Json<Page<PostDetail>>, Error> {
    let page = PageParams {
        cursor: params.cursor,
        size: params.size,
    }
    .page()?;
    let filter = FeedFilter {
        author_id: params.author_id,
        following: params.following,
    };
    Ok(Json(post::feed(&mut manager.db().await?, me.map(|u| u.id), filter, &page).await?))
}

pub async fn create<M: Manager>(me: UserInfo, Json(body): Json<Create>, manager: Data<M>, cache: Data<WidgetCache>) -> Result<HttpResponse, Error> {
    let created = post::create(&mut manager.db().await?, me.id, body).await?;
    cache.invalidate(me.id).await;
    Ok(HttpResponse::Created().json(created))
}

pub async fn detail<M: Manager>(me: Option<UserInfo>, id: Path<(i32,)>, ip: ClientIp, manager: Data<M>) -> Result<Json<PostDetail>, Error> {
    let id = id.into_inner().0;
    Ok(Json(post::get(&mut manager.db().await?, id, me.map(|u| u.id), &ip.0).await?))
}

pub async fn update<M: Manager>(me: UserInfo, id: Path<(i32,)>, Json(body): Json<Update>, manager: Data<M>, cache: Data<WidgetCache>) -> Result<Json<PostDetail>, Error> {
    let id = id.into_inner().0;
    let updated = post::update(&mut manager.db().await?, id, me.id, body).await?;
    cache.invalidate(me.id).await;
    Ok(Json(updated))
}

pub async fn delete<M: Manager>(me: UserInfo, id: Path<(i32,)>, manager: Data<M>, cache: Data<WidgetCache>) -> Result<HttpResponse, Error> {
    let id = id.into_inner().0;
    post::delete(&mut manager.db().await?, id, me.id).await?;
    cache.invalidate(me.id).await;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn comments<M: Manager>(me: Option<UserInfo>, id: Path<(i32,)>, Query(params): Query<PageParams>, manager: Data<M>) -> Result<Json<Page<Comment>>, Error> {
    let id = id.into_inner().0;
    let page = params.page()?;
    Ok(Json(comment::list(&mut manager.db().await?, id, me.map(|u| u.id), &page).await?))
}

pub async fn add_comment<M: Manager>(me: UserInfo, id: Path<(i32,)>, Json(body): Json<CommentCreate>, manager: Data<M>) -> Result<HttpResponse, Error> {
    let id = id.into_inner().0;
    let created = comment::create(&mut manager.db().await?, id, me.id, body).await?;
    Ok(HttpResponse::Created().json(created))
}

pub async fn delete_comment<M: Manager>(me: UserInfo, id: Path<(i32,)>, manager: Data<M>) -> Result<HttpResponse, Error> {
    let id = id.into_inner().0;
    comment::delete(&mut manager.db().await?, id, me.id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn like<M: Manager>(me: UserInfo, id: Path<(i32,)>, manager: Data<M>) -> Result<Json<LikeStatus>, Error> {
    let id = id.into_inner().0;
    Ok(Json(reaction::like(&mut manager.db().await?, id, me.id).await?))
}

pub async fn unlike<M: Manager>(me: UserInfo, id: Path<(i32,)>, manager: Data<M>) -> Result<Json<LikeStatus>, Error> {
    let id = id.into_inner().0;
    Ok(Json(reaction::unlike(&mut manager.db().await?, id, me.id).await?))
}

pub async fn bookmark<M: Manager>(me: UserInfo, id: Path<(i32,)>, manager: Data<M>) -> Result<Json<BookmarkStatus>, Error> {
    let id = id.into_inner().0;
    Ok(Json(reaction::bookmark(&mut manager.db().await?, id, me.id).await?))
}

pub async fn unbookmark<M: Manager>(me: UserInfo, id: Path<(i32,)>, manager: Data<M>) -> Result<Json<BookmarkStatus>, Error> {
    let id = id.into_inner().0;
    Ok(Json(reaction::unbookmark(&mut manager.db().await?, id, me.id).await?))
}

pub async fn bookmarks<M: Manager>(me: UserInfo, Query(params): Query<PageParams>, manager: Data<M>) -> Result<Json<Page<PostDetail>>, Error> {
    let page = params.page()?;
    Ok(Json(reaction::bookmarks(&mut manager.db().await?, me.id, &page).await?))
}
