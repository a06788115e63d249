use super::notification::notify;
use super::post::visible;
use crate::core::models::notification::Kind;
use crate::core::models::post::PostDetail;
use crate::core::models::reaction::{BookmarkStatus, FollowStatus, LikeStatus};
use crate::core::pagination::{Page, PageRequest};
use crate::core::ports::repository::{PostCommon, ReactionCommon, Store, UserCommon};
use crate::error::Error;

pub async fn like<S: Store>(store: &mut S, post_id: i32, uid: i32) -> Result<LikeStatus, Error> {
    let post = visible(store, post_id, Some(uid)).await?;
    if ReactionCommon::insert_like(store, post_id, uid).await? {
        notify(store, post.author_id, uid, Kind::Like, Some(post_id), post.organization_id).await?;
    }
    Ok(LikeStatus {
        liked: true,
        like_count: ReactionCommon::like_count(store, post_id).await?,
    })
}

pub async fn unlike<S: Store>(store: &mut S, post_id: i32, uid: i32) -> Result<LikeStatus, Error> {
    visible(store, post_id, Some(uid)).await?;
    ReactionCommon::delete_like(store, post_id, uid).await?;
    Ok(LikeStatus {
        liked: false,
        like_count: ReactionCommon::like_count(store, post_id).await?,
    })
}

pub async fn bookmark<S: Store>(store: &mut S, post_id: i32, uid: i32) -> Result<BookmarkStatus, Error> {
    visible(store, post_id, Some(uid)).await?;
    ReactionCommon::insert_bookmark(store, post_id, uid).await?;
    Ok(BookmarkStatus { bookmarked: true })
}

pub async fn unbookmark<S: Store>(store: &mut S, post_id: i32, uid: i32) -> Result<BookmarkStatus, Error> {
    ReactionCommon::delete_bookmark(store, post_id, uid).await?;
    Ok(BookmarkStatus { bookmarked: false })
}

/// The caller's bookmarks, most recently bookmarked first.
pub async fn bookmarks<S: Store>(store: &mut S, uid: i32, page: &PageRequest) -> Result<Page<PostDetail>, Error> {
    let rows = PostCommon::bookmarked(store, uid, page).await?;
    Ok(Page::from_rows(rows, page))
}

async fn followee<S: Store>(store: &mut S, uid: i32, target: i32) -> Result<(), Error> {
    if uid == target {
        return Err(Error::bad_request("you cannot follow yourself"));
    }
    UserCommon::get(store, target).await?.ok_or_else(|| Error::not_found("user"))?;
    Ok(())
}

pub async fn follow<S: Store>(store: &mut S, uid: i32, target: i32) -> Result<FollowStatus, Error> {
    followee(store, uid, target).await?;
    if ReactionCommon::insert_follow(store, uid, target).await? {
        notify(store, target, uid, Kind::Follow, None, None).await?;
    }
    Ok(FollowStatus {
        following: true,
        follower_count: ReactionCommon::follower_count(store, target).await?,
    })
}

pub async fn unfollow<S: Store>(store: &mut S, uid: i32, target: i32) -> Result<FollowStatus, Error> {
    followee(store, uid, target).await?;
    ReactionCommon::delete_follow(store, uid, target).await?;
    Ok(FollowStatus {
        following: false,
        follower_count: ReactionCommon::follower_count(store, target).await?,
    })
}
