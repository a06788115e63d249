use super::notification::notify;
use super::post::{validate_content, visible};
use crate::core::models::comment::{Comment, Create, Insert};
use crate::core::models::notification::Kind;
use crate::core::pagination::{Page, PageRequest};
use crate::core::ports::repository::{CommentCommon, PostCommon, Store};
use crate::error::Error;

/// Comments of a post, oldest first.
pub async fn list<S: Store>(store: &mut S, post_id: i32, viewer: Option<i32>, page: &PageRequest) -> Result<Page<Comment>, Error> {
    visible(store, post_id, viewer).await?;
    let rows = CommentCommon::query(store, post_id, page).await?;
    Ok(Page::from_rows(rows, page))
}

pub async fn create<S: Store>(store: &mut S, post_id: i32, uid: i32, data: Create) -> Result<Comment, Error> {
    let post = visible(store, post_id, Some(uid)).await?;
    validate_content(&data.content)?;
    let id = CommentCommon::insert(
        store,
        Insert {
            post_id,
            author_id: uid,
            content: data.content,
        },
    )
    .await?;
    notify(store, post.author_id, uid, Kind::Comment, Some(post_id), post.organization_id).await?;
    CommentCommon::get(store, id).await?.ok_or_else(|| Error::not_found("comment"))
}

/// The comment's author or the post's author may delete a comment.
pub async fn delete<S: Store>(store: &mut S, id: i32, uid: i32) -> Result<(), Error> {
    let comment = CommentCommon::get(store, id).await?.ok_or_else(|| Error::not_found("comment"))?;
    if comment.author_id != uid {
        let post = PostCommon::get(store, comment.post_id).await?.ok_or_else(|| Error::not_found("post"))?;
        if post.author_id != uid {
            return Err(Error::forbidden("cannot delete someone else's comment"));
        }
    }
    CommentCommon::delete(store, id).await
}
