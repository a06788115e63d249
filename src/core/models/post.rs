use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::core::pagination::{Cursor, Keyed};

pub const MAX_CONTENT_LEN: usize = 5000;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Post {
    pub id: i32,
    pub author_id: i32,
    pub organization_id: Option<i32>,
    pub content: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A post with its author, counters and the viewer's own reactions.
/// `sort_at` is the list's ordering timestamp: creation time in feeds,
/// bookmark time in the bookmark list.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct PostDetail {
    pub id: i32,
    pub author_id: i32,
    pub author_name: String,
    pub author_image: Option<String>,
    pub organization_id: Option<i32>,
    pub content: String,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub like_count: i64,
    pub comment_count: i64,
    pub view_count: i64,
    pub liked: bool,
    pub bookmarked: bool,
    #[serde(skip)]
    pub sort_at: DateTime<Utc>,
}

impl Keyed for PostDetail {
    fn cursor(&self) -> Cursor {
        Cursor::new(self.sort_at, self.id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Query {
    pub author_id: Option<i32>,
    pub organization_id: Option<i32>,
    /// Excludes organization posts.
    pub personal_only: bool,
    pub published_only: bool,
    /// Only posts whose author this user follows.
    pub followed_by: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub author_id: i32,
    pub organization_id: Option<i32>,
    pub content: String,
    pub published: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Create {
    pub content: String,
    pub organization_id: Option<i32>,
    pub published: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Update {
    pub content: Option<String>,
    pub published: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct View {
    pub post_id: i32,
    pub viewer_id: Option<i32>,
    pub ip: String,
}
