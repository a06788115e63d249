use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::organization::Role;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Invitation {
    pub id: i32,
    pub organization_id: i32,
    pub email: String,
    pub role: Role,
    #[serde(skip)]
    pub token: String,
    pub inviter_id: i32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Invitation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub organization_id: i32,
    pub email: String,
    pub role: Role,
    pub token: String,
    pub inviter_id: i32,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Create {
    pub email: String,
    pub role: Role,
}
