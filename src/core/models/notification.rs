use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::text_column;
use crate::core::pagination::{Cursor, Keyed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Kind {
    Like,
    Comment,
    Follow,
    Invitation,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Like => "LIKE",
            Kind::Comment => "COMMENT",
            Kind::Follow => "FOLLOW",
            Kind::Invitation => "INVITATION",
        }
    }
}

impl FromStr for Kind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LIKE" => Ok(Kind::Like),
            "COMMENT" => Ok(Kind::Comment),
            "FOLLOW" => Ok(Kind::Follow),
            "INVITATION" => Ok(Kind::Invitation),
            _ => Err(format!("unknown notification kind: {}", s)),
        }
    }
}

text_column!(Kind);

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Notification {
    pub id: i32,
    pub recipient_id: i32,
    pub actor_id: i32,
    pub actor_name: String,
    pub kind: Kind,
    pub post_id: Option<i32>,
    pub organization_id: Option<i32>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Keyed for Notification {
    fn cursor(&self) -> Cursor {
        Cursor::new(self.created_at, self.id)
    }
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub recipient_id: i32,
    pub actor_id: i32,
    pub kind: Kind,
    pub post_id: Option<i32>,
    pub organization_id: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct Query {
    pub recipient_id: i32,
    pub unread_only: bool,
}
