//! Read-only access to a user's public posts for embedding on other sites.
//!
//! Widget tokens are JWTs signed with their own secret and carrying the
//! `widget` audience, so a session token never passes as a widget token
//! and the other way round.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::TtlCache;
use crate::core::models::post::{PostDetail, Query};
use crate::core::models::user::Profile;
use crate::core::pagination::{Cursor, Page, PageRequest};
use super::user;
use crate::core::ports::repository::{PostCommon, Store};
use crate::core::ports::tokener::{Payload, Tokener};
use crate::error::Error;

pub const WIDGET_AUDIENCE: &str = "widget";
pub const WIDGET_TOKEN_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetClaim {
    pub sub: String,
    pub aud: String,
    pub exp: i64,
}

impl Payload for WidgetClaim {
    fn user(&self) -> &str {
        &self.sub
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub fn issue_token<T: Tokener<WidgetClaim>>(tokener: &T, uid: i32, now: DateTime<Utc>) -> Result<WidgetToken, Error> {
    let expires_at = now + Duration::days(WIDGET_TOKEN_DAYS);
    let token = tokener.gen_token(&WidgetClaim {
        sub: uid.to_string(),
        aud: WIDGET_AUDIENCE.to_owned(),
        exp: expires_at.timestamp(),
    })?;
    Ok(WidgetToken { token, expires_at })
}

/// Resolves an `Authorization` header value to the token's user id.
pub fn authenticate<T: Tokener<WidgetClaim>>(tokener: &T, authorization: Option<&str>) -> Result<i32, Error> {
    let token = authorization
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(Error::Unauthenticated)?;
    let claim = tokener.verify_token(token).map_err(|_| Error::Unauthenticated)?;
    claim.user().parse().map_err(|_| Error::Unauthenticated)
}

type PostsKey = (i32, Option<Cursor>, i64);

/// Short-lived copies of widget responses.
#[derive(Clone)]
pub struct WidgetCache {
    posts: TtlCache<PostsKey, Page<PostDetail>>,
    profiles: TtlCache<i32, Profile>,
}

impl WidgetCache {
    pub fn new(ttl: StdDuration) -> Self {
        Self {
            posts: TtlCache::new(ttl),
            profiles: TtlCache::new(ttl),
        }
    }

    /// Drops everything cached for `uid`.
    pub async fn invalidate(&self, uid: i32) {
        self.posts.remove_where(|(owner, _, _)| *owner == uid).await;
        self.profiles.remove(&uid).await;
    }

    pub async fn purge_expired(&self) -> usize {
        self.posts.purge_expired().await + self.profiles.purge_expired().await
    }
}

/// Published personal posts of `uid`, newest first.
pub async fn posts<S: Store>(store: &mut S, cache: &WidgetCache, uid: i32, page: &PageRequest) -> Result<Page<PostDetail>, Error> {
    cache
        .posts
        .get_or_insert_with((uid, page.cursor, page.size), move || async move {
            let query = Query {
                author_id: Some(uid),
                personal_only: true,
                published_only: true,
                ..default::default()
            };
            let rows = PostCommon::query(store, &query, None, page).await?;
            Ok(Page::from_rows(rows, page))
        })
        .await
}

pub async fn profile<S: Store>(store: &mut S, cache: &WidgetCache, uid: i32) -> Result<Profile, Error> {
    cache
        .profiles
        .get_or_insert_with(uid, move || user::profile(store, uid))
        .await
}
