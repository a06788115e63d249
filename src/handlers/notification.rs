use actix_web::web::{Data, Json, Path, Query};
use actix_web::HttpResponse;
use serde::Deserialize;

use crate::context::UserInfo;
use crate::core::models::notification::Notification;
use crate::core::pagination::Page;
use crate::core::ports::repository::Manager;
use crate::core::services::notification;
use crate::error::Error;
use crate::request::PageParams;
use crate::response::{Count, Updated};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub cursor: Option<String>,
    pub size: Option<i64>,
    #[serde(default)]
    pub unread: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct MarkRead {
    pub ids: Option<Vec<i32>>,
}

pub async fn list<M: Manager>(me: UserInfo, Query(params): Query<ListParams>, manager: Data<M>) -> Result<Json<Page<Notification>>, Error> {
    let page = PageParams {
        cursor: params.cursor,
        size: params.size,
    }
    .page()?;
    Ok(Json(notification::list(&mut manager.db().await?, me.id, params.unread, &page).await?))
}

pub async fn unread_count<M: Manager>(me: UserInfo, manager: Data<M>) -> Result<Json<Count>, Error> {
    let count = notification::unread_count(&mut manager.db().await?, me.id).await?;
    Ok(Json(Count { count }))
}

pub async fn mark_read<M: Manager>(me: UserInfo, body: Option<Json<MarkRead>>, manager: Data<M>) -> Result<Json<Updated>, Error> {
    let ids = body.and_then(|b| b.into_inner().ids);
    let updated = notification::mark_read(&mut manager.db().await?, me.id, ids).await?;
    Ok(Json(Updated { updated }))
}

pub async fn delete<M: Manager>(me: UserInfo, id: Path<(i32,)>, manager: Data<M>) -> Result<HttpResponse, Error> {
    let id = id.into_inner().0;
    notification::delete(&mut manager.db().await?, me.id, id).await?;
    Ok(HttpResponse::NoContent().finish())
}
