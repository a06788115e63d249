use serde::Deserialize;

use crate::core::models::post::{Create, Insert, Post, PostDetail, Query, Update, View, MAX_CONTENT_LEN};
use crate::core::pagination::{Page, PageRequest};
use crate::core::ports::repository::{MembershipCommon, OrganizationCommon, PostCommon, Store};
use crate::error::Error;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedFilter {
    pub author_id: Option<i32>,
    #[serde(default)]
    pub following: bool,
}

pub fn validate_content(content: &str) -> Result<(), Error> {
    let len = content.chars().count();
    if content.trim().is_empty() || len > MAX_CONTENT_LEN {
        return Err(Error::bad_request(format!("content must be 1 to {} characters", MAX_CONTENT_LEN)));
    }
    Ok(())
}

/// Loads a post the viewer may see. Drafts are hidden from everyone but
/// their author; organization posts are limited to members.
pub async fn visible<S: Store>(store: &mut S, id: i32, viewer: Option<i32>) -> Result<Post, Error> {
    let post = PostCommon::get(store, id).await?.ok_or_else(|| Error::not_found("post"))?;
    if !post.published && viewer != Some(post.author_id) {
        return Err(Error::not_found("post"));
    }
    if let Some(org_id) = post.organization_id {
        let member = match viewer {
            Some(uid) => MembershipCommon::role_of(store, org_id, uid).await?.is_some(),
            None => false,
        };
        if !member {
            return Err(Error::forbidden("post belongs to an organization you are not a member of"));
        }
    }
    Ok(post)
}

async fn owned<S: Store>(store: &mut S, id: i32, uid: i32) -> Result<Post, Error> {
    let post = PostCommon::get(store, id).await?.ok_or_else(|| Error::not_found("post"))?;
    if post.author_id != uid {
        return Err(Error::forbidden("only the author can change this post"));
    }
    Ok(post)
}

async fn detail_of<S: Store>(store: &mut S, id: i32, viewer: Option<i32>) -> Result<PostDetail, Error> {
    PostCommon::detail(store, id, viewer).await?.ok_or_else(|| Error::not_found("post"))
}

pub async fn create<S: Store>(store: &mut S, uid: i32, data: Create) -> Result<PostDetail, Error> {
    validate_content(&data.content)?;
    if let Some(org_id) = data.organization_id {
        if OrganizationCommon::get(store, org_id).await?.is_none() {
            return Err(Error::not_found("organization"));
        }
        if MembershipCommon::role_of(store, org_id, uid).await?.is_none() {
            return Err(Error::forbidden("not a member of this organization"));
        }
    }
    let id = PostCommon::insert(
        store,
        Insert {
            author_id: uid,
            organization_id: data.organization_id,
            content: data.content,
            published: data.published.unwrap_or(true),
        },
    )
    .await?;
    detail_of(store, id, Some(uid)).await
}

/// Published personal posts, newest first.
pub async fn feed<S: Store>(store: &mut S, viewer: Option<i32>, filter: FeedFilter, page: &PageRequest) -> Result<Page<PostDetail>, Error> {
    let followed_by = if filter.following {
        Some(viewer.ok_or(Error::Unauthenticated)?)
    } else {
        None
    };
    let query = Query {
        author_id: filter.author_id,
        personal_only: true,
        published_only: true,
        followed_by,
        ..default::default()
    };
    let rows = PostCommon::query(store, &query, viewer, page).await?;
    Ok(Page::from_rows(rows, page))
}

/// Fetches a post and counts the view once per (post, viewer, ip).
pub async fn get<S: Store>(store: &mut S, id: i32, viewer: Option<i32>, ip: &str) -> Result<PostDetail, Error> {
    visible(store, id, viewer).await?;
    PostCommon::record_view(
        store,
        View {
            post_id: id,
            viewer_id: viewer,
            ip: ip.to_owned(),
        },
    )
    .await?;
    detail_of(store, id, viewer).await
}

pub async fn update<S: Store>(store: &mut S, id: i32, uid: i32, data: Update) -> Result<PostDetail, Error> {
    owned(store, id, uid).await?;
    if let Some(content) = &data.content {
        validate_content(content)?;
    }
    PostCommon::update(store, id, data).await?;
    detail_of(store, id, Some(uid)).await
}

pub async fn delete<S: Store>(store: &mut S, id: i32, uid: i32) -> Result<(), Error> {
    owned(store, id, uid).await?;
    PostCommon::delete(store, id).await
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::core::models::organization::Role;
    use crate::core::ports::repository::ReactionCommon;
    use crate::core::services::testing;
    use crate::impls::repository::memory::MemManager;

    fn content(s: &str) -> Create {
        Create {
            content: s.into(),
            organization_id: None,
            published: None,
        }
    }

    #[test]
    fn test_validate_content() {
        assert!(validate_content("hello").is_ok());
        assert!(validate_content("   ").is_err());
        assert!(validate_content(&"x".repeat(MAX_CONTENT_LEN)).is_ok());
        assert!(validate_content(&"x".repeat(MAX_CONTENT_LEN + 1)).is_err());
    }

    #[tokio::test]
    async fn test_create_and_edit_by_author_only() {
        let manager = MemManager::new();
        let ann = testing::user(&manager, "ann@example.com").await;
        let bob = testing::user(&manager, "bob@example.com").await;
        let mut db = testing::db(&manager).await;
        let post = create(&mut db, ann, content("first")).await.unwrap();
        assert!(post.published);
        assert_eq!(post.author_name, "ann");

        let edit = Update {
            content: Some("edited".into()),
            published: None,
        };
        assert!(matches!(update(&mut db, post.id, bob, edit.clone()).await, Err(Error::Forbidden(_))));
        assert_eq!(update(&mut db, post.id, ann, edit).await.unwrap().content, "edited");
        assert!(matches!(delete(&mut db, post.id, bob).await, Err(Error::Forbidden(_))));
        delete(&mut db, post.id, ann).await.unwrap();
        assert!(matches!(delete(&mut db, post.id, ann).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_drafts_visible_to_author_only() {
        let manager = MemManager::new();
        let ann = testing::user(&manager, "ann@example.com").await;
        let bob = testing::user(&manager, "bob@example.com").await;
        let draft = testing::post(&manager, ann, None, false).await;
        let mut db = testing::db(&manager).await;
        assert!(get(&mut db, draft, Some(ann), "1.1.1.1").await.is_ok());
        assert!(matches!(get(&mut db, draft, Some(bob), "1.1.1.1").await, Err(Error::NotFound(_))));
        assert!(matches!(get(&mut db, draft, None, "1.1.1.1").await, Err(Error::NotFound(_))));
        assert!(feed(&mut db, None, FeedFilter::default(), &PageRequest::default()).await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn test_views_counted_once_per_viewer_and_ip() {
        let manager = MemManager::new();
        let ann = testing::user(&manager, "ann@example.com").await;
        let id = testing::post(&manager, ann, None, true).await;
        let mut db = testing::db(&manager).await;
        get(&mut db, id, None, "1.1.1.1").await.unwrap();
        get(&mut db, id, None, "1.1.1.1").await.unwrap();
        get(&mut db, id, Some(ann), "1.1.1.1").await.unwrap();
        let post = get(&mut db, id, None, "2.2.2.2").await.unwrap();
        assert_eq!(post.view_count, 3);
    }

    #[tokio::test]
    async fn test_organization_posts_require_membership() {
        let manager = MemManager::new();
        let ann = testing::user(&manager, "ann@example.com").await;
        let bob = testing::user(&manager, "bob@example.com").await;
        let mut db = testing::db(&manager).await;
        let org_id = OrganizationCommon::insert(
            &mut db,
            crate::core::models::organization::Insert {
                name: "Acme".into(),
                slug: "acme".into(),
            },
        )
        .await
        .unwrap();
        MembershipCommon::add_member(&mut db, org_id, ann, Role::Member).await.unwrap();
        let data = Create {
            content: "internal".into(),
            organization_id: Some(org_id),
            published: None,
        };
        assert!(matches!(create(&mut db, bob, data.clone()).await, Err(Error::Forbidden(_))));
        let post = create(&mut db, ann, data).await.unwrap();
        assert!(matches!(get(&mut db, post.id, Some(bob), "ip").await, Err(Error::Forbidden(_))));
        assert!(feed(&mut db, Some(ann), FeedFilter::default(), &PageRequest::default()).await.unwrap().items.is_empty());
    }

    #[tokio::test]
    async fn test_following_feed() {
        let manager = MemManager::new();
        let ann = testing::user(&manager, "ann@example.com").await;
        let bob = testing::user(&manager, "bob@example.com").await;
        let cat = testing::user(&manager, "cat@example.com").await;
        testing::post(&manager, bob, None, true).await;
        testing::post(&manager, cat, None, true).await;
        let mut db = testing::db(&manager).await;
        db.insert_follow(ann, bob).await.unwrap();
        let filter = FeedFilter {
            author_id: None,
            following: true,
        };
        let page = feed(&mut db, Some(ann), filter.clone(), &PageRequest::default()).await.unwrap();
        assert_eq!(page.items.iter().map(|p| p.author_id).collect::<Vec<_>>(), vec![bob]);
        assert!(matches!(feed(&mut db, None, filter, &PageRequest::default()).await, Err(Error::Unauthenticated)));
    }
}
