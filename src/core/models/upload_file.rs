use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, FromRow, PartialEq)]
pub struct UploadedFile {
    pub id: i32,
    pub owner_id: i32,
    pub name: String,
    pub extension: String,
    pub size: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Insert {
    pub owner_id: i32,
    pub name: String,
    pub extension: String,
    pub size: i64,
}

#[derive(Debug, Clone)]
pub struct UploadedFileCreate {
    pub owner_id: i32,
    pub extension: String,
    pub content: Bytes,
}
