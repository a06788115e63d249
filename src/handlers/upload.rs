use actix_files::NamedFile;
use actix_multipart::Multipart;
use actix_web::web::{Data, Json, Path};
use bytes::BytesMut;
use futures_util::TryStreamExt;

use crate::config::Config;
use crate::context::UserInfo;
use crate::core::models::upload_file::{UploadedFileCreate, MAX_UPLOAD_BYTES};
use crate::core::ports::repository::Manager;
use crate::core::ports::uploader::Uploader;
use crate::core::services::upload::{self, extension_of, Uploaded};
use crate::error::Error;

pub async fn create<M: Manager, U: Uploader + 'static>(
    me: UserInfo,
    mut payload: Multipart,
    manager: Data<M>,
    uploader: Data<U>,
    config: Data<Config>,
) -> Result<Json<Vec<Uploaded>>, Error> {
    let mut uploaded = Vec::new();
    let mut db = manager.db().await?;
    while let Some(mut field) = payload.try_next().await? {
        let extension = field.content_disposition().get_filename().map(extension_of).unwrap_or_default();
        let mut content = BytesMut::new();
        while let Some(chunk) = field.try_next().await? {
            if content.len() + chunk.len() > MAX_UPLOAD_BYTES {
                return Err(Error::bad_request(format!("file exceeds {} bytes", MAX_UPLOAD_BYTES)));
            }
            content.extend_from_slice(&chunk);
        }
        let file = UploadedFileCreate {
            owner_id: me.id,
            extension,
            content: content.freeze(),
        };
        uploaded.push(upload::upload(&mut db, uploader.get_ref(), &config.public_url, file).await?);
    }
    if uploaded.is_empty() {
        return Err(Error::bad_request("no file in request"));
    }
    Ok(Json(uploaded))
}

pub async fn fetch<M: Manager, U: Uploader + 'static>(name: Path<(String,)>, manager: Data<M>, uploader: Data<U>) -> Result<NamedFile, Error> {
    let name = name.into_inner().0;
    let path = upload::locate(&mut manager.db().await?, uploader.get_ref(), &name).await?;
    Ok(NamedFile::open_async(path).await?)
}
