use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub salt: Option<String>,
    pub email_verified: bool,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The signed-in user's own view of their account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Me {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub email_verified: bool,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for Me {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            email_verified: u.email_verified,
            bio: u.bio,
            image: u.image,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub name: String,
    pub email: String,
    pub password: Option<String>,
    pub salt: Option<String>,
    pub email_verified: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Patch {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Profile {
    pub id: i32,
    pub name: String,
    pub bio: Option<String>,
    pub image: Option<String>,
    pub follower_count: i64,
    pub following_count: i64,
    pub post_count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct VerificationToken {
    pub identifier: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}
