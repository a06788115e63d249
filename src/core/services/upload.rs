use std::path::PathBuf;

use serde::Serialize;

use crate::core::models::upload_file::{Insert, UploadedFileCreate, MAX_UPLOAD_BYTES};
use crate::core::ports::repository::{Store, UploadCommon};
use crate::core::ports::uploader::Uploader;
use crate::error::Error;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Uploaded {
    pub id: i32,
    pub name: String,
    pub url: String,
}

/// Lowercased alphanumeric extension, or empty when the name has none.
pub fn extension_of(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()) => ext.to_ascii_lowercase(),
        _ => String::new(),
    }
}

pub async fn upload<S, U>(store: &mut S, uploader: &U, public_url: &str, file: UploadedFileCreate) -> Result<Uploaded, Error>
where
    S: Store,
    U: Uploader,
{
    if file.content.is_empty() {
        return Err(Error::bad_request("empty file"));
    }
    if file.content.len() > MAX_UPLOAD_BYTES {
        return Err(Error::bad_request(format!("file exceeds {} bytes", MAX_UPLOAD_BYTES)));
    }
    let name = uploader.put(&file)?;
    let id = UploadCommon::insert(
        store,
        Insert {
            owner_id: file.owner_id,
            name: name.clone(),
            extension: file.extension,
            size: file.content.len() as i64,
        },
    )
    .await?;
    Ok(Uploaded {
        id,
        url: format!("{}/uploads/{}", public_url, name),
        name,
    })
}

/// Path of a recorded upload on disk.
pub async fn locate<S, U>(store: &mut S, uploader: &U, name: &str) -> Result<PathBuf, Error>
where
    S: Store,
    U: Uploader,
{
    let file = UploadCommon::get_by_name(store, name).await?.ok_or_else(|| Error::not_found("file"))?;
    uploader.path_of(&file.name)
}
