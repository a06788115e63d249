use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::core::pagination::{Cursor, Keyed};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Comment {
    pub id: i32,
    pub post_id: i32,
    pub author_id: i32,
    pub author_name: String,
    pub author_image: Option<String>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Keyed for Comment {
    fn cursor(&self) -> Cursor {
        Cursor::new(self.created_at, self.id)
    }
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub post_id: i32,
    pub author_id: i32,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Create {
    pub content: String,
}
