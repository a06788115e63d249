use std::fs::{create_dir_all, write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::core::models::upload_file::UploadedFileCreate;
use crate::core::ports::uploader::Uploader;
use crate::error::Error;

/// Stores uploads as `<uuid>.<ext>` files in one directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, Error> {
        create_dir_all(path.as_ref())?;
        Ok(Self {
            path: path.as_ref().to_path_buf(),
        })
    }
}

fn valid_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

impl Uploader for LocalStorage {
    fn put(&self, file: &UploadedFileCreate) -> Result<String, Error> {
        let filename = if file.extension.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            format!("{}.{}", Uuid::new_v4(), file.extension)
        };
        write(self.path.join(&filename), &file.content)?;
        Ok(filename)
    }

    fn path_of(&self, name: &str) -> Result<PathBuf, Error> {
        if !valid_name(name) || name.contains("..") {
            return Err(Error::not_found("file"));
        }
        Ok(self.path.join(name))
    }
}
