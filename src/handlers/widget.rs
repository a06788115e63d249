use actix_web::http::header::AUTHORIZATION;
use actix_web::web::{Data, Json, Query};
use actix_web::{HttpRequest, HttpResponse};
use chrono::Utc;

use crate::context::{Tokeners, UserInfo};
use crate::core::models::post::PostDetail;
use crate::core::models::user::Profile;
use crate::core::pagination::Page;
use crate::core::ports::repository::Manager;
use crate::core::services::widget::{self, WidgetCache, WidgetToken};
use crate::error::Error;
use crate::request::PageParams;

fn widget_user(req: &HttpRequest, tokeners: &Tokeners) -> Result<i32, Error> {
    let header = req.headers().get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    widget::authenticate(&tokeners.widget, header)
}

pub async fn token(me: UserInfo, tokeners: Data<Tokeners>) -> Result<Json<WidgetToken>, Error> {
    Ok(Json(widget::issue_token(&tokeners.widget, me.id, Utc::now())?))
}

pub async fn posts<M: Manager>(
    req: HttpRequest,
    Query(params): Query<PageParams>,
    manager: Data<M>,
    tokeners: Data<Tokeners>,
    cache: Data<WidgetCache>,
) -> Result<Json<Page<PostDetail>>, Error> {
    let uid = widget_user(&req, &tokeners)?;
    let page = params.page()?;
    Ok(Json(widget::posts(&mut manager.db().await?, &cache, uid, &page).await?))
}

pub async fn profile<M: Manager>(req: HttpRequest, manager: Data<M>, tokeners: Data<Tokeners>, cache: Data<WidgetCache>) -> Result<Json<Profile>, Error> {
    let uid = widget_user(&req, &tokeners)?;
    Ok(Json(widget::profile(&mut manager.db().await?, &cache, uid).await?))
}

pub async fn preflight() -> HttpResponse {
    HttpResponse::NoContent().finish()
}
