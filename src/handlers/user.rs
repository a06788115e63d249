use actix_web::web::{Data, Json, Path};

use crate::context::UserInfo;
use crate::core::models::reaction::FollowStatus;
use crate::core::models::user::Profile;
use crate::core::ports::repository::Manager;
use crate::core::services::reaction;
use crate::core::services::widget::{self, WidgetCache};
use crate::error::Error;

/// Public profiles share the widget's cache.
pub async fn profile<M: Manager>(id: Path<(i32,)>, manager: Data<M>, cache: Data<WidgetCache>) -> Result<Json<Profile>, Error> {
    let id = id.into_inner().0;
    Ok(Json(widget::profile(&mut manager.db().await?, &cache, id).await?))
}

pub async fn follow<M: Manager>(me: UserInfo, id: Path<(i32,)>, manager: Data<M>, cache: Data<WidgetCache>) -> Result<Json<FollowStatus>, Error> {
    let id = id.into_inner().0;
    let status = reaction::follow(&mut manager.db().await?, me.id, id).await?;
    cache.invalidate(id).await;
    cache.invalidate(me.id).await;
    Ok(Json(status))
}

pub async fn unfollow<M: Manager>(me: UserInfo, id: Path<(i32,)>, manager: Data<M>, cache: Data<WidgetCache>) -> Result<Json<FollowStatus>, Error> {
    let id = id.into_inner().0;
    let status = reaction::unfollow(&mut manager.db().await?, me.id, id).await?;
    cache.invalidate(id).await;
    cache.invalidate(me.id).await;
    Ok(Json(status))
}
