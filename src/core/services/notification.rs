use crate::core::models::notification::{Insert, Kind, Notification, Query};
use crate::core::pagination::{Page, PageRequest};
use crate::core::ports::repository::{NotificationCommon, Store};
use crate::error::Error;

/// Records a notification unless the actor is acting on their own content.
/// Likes and follows are not repeated while an earlier one from the same
/// actor is still unread, so toggling does not flood the inbox.
pub async fn notify<S: Store>(store: &mut S, recipient_id: i32, actor_id: i32, kind: Kind, post_id: Option<i32>, organization_id: Option<i32>) -> Result<(), Error> {
    if recipient_id == actor_id {
        return Ok(());
    }
    let insert = Insert {
        recipient_id,
        actor_id,
        kind,
        post_id,
        organization_id,
    };
    if matches!(kind, Kind::Like | Kind::Follow) && NotificationCommon::has_unread(store, &insert).await? {
        return Ok(());
    }
    NotificationCommon::insert(store, insert).await?;
    Ok(())
}

pub async fn list<S: Store>(store: &mut S, uid: i32, unread_only: bool, page: &PageRequest) -> Result<Page<Notification>, Error> {
    let query = Query {
        recipient_id: uid,
        unread_only,
    };
    let rows = NotificationCommon::query(store, &query, page).await?;
    Ok(Page::from_rows(rows, page))
}

pub async fn unread_count<S: Store>(store: &mut S, uid: i32) -> Result<i64, Error> {
    NotificationCommon::unread_count(store, uid).await
}

pub async fn mark_read<S: Store>(store: &mut S, uid: i32, ids: Option<Vec<i32>>) -> Result<u64, Error> {
    if matches!(&ids, Some(ids) if ids.is_empty()) {
        return Ok(0);
    }
    NotificationCommon::mark_read(store, uid, ids).await
}

/// Only the recipient may delete; anyone else sees a missing notification.
pub async fn delete<S: Store>(store: &mut S, uid: i32, id: i32) -> Result<(), Error> {
    if !NotificationCommon::delete(store, uid, id).await? {
        return Err(Error::not_found("notification"));
    }
    Ok(())
}
