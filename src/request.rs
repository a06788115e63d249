use serde::Deserialize;

use crate::core::pagination::{Cursor, PageRequest};
use crate::error::Error;

/// `?cursor=&size=` on every list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub cursor: Option<String>,
    pub size: Option<i64>,
}

impl PageParams {
    pub fn page(&self) -> Result<PageRequest, Error> {
        let cursor = match self.cursor.as_deref() {
            Some(c) if !c.is_empty() => Some(Cursor::decode(c)?),
            _ => None,
        };
        PageRequest::new(cursor, self.size)
    }
}
