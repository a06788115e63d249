use crate::core::models::upload_file::UploadedFileCreate;
use crate::error::Error;
use std::path::PathBuf;

pub trait Uploader {
    /// Writes the content and returns the generated file name.
    fn put(&self, file: &UploadedFileCreate) -> Result<String, Error>;
    fn path_of(&self, name: &str) -> Result<PathBuf, Error>;
}
