use std::future::Future;

use crate::core::pagination::{Cursor, Page};
use crate::error::Error;

/// Pages accumulated one after another, as an infinite scroll shows them.
#[derive(Debug, Clone)]
pub struct InfiniteList<T> {
    items: Vec<T>,
    next_cursor: Option<Cursor>,
    loaded: bool,
}

impl<T> Default for InfiniteList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
            loaded: false,
        }
    }
}

impl<T> InfiniteList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn next_cursor(&self) -> Option<Cursor> {
        self.next_cursor
    }

    /// False once a page came back without a next cursor.
    pub fn has_more(&self) -> bool {
        !self.loaded || self.next_cursor.is_some()
    }

    pub fn push_page(&mut self, page: Page<T>) {
        self.loaded = true;
        self.next_cursor = page.next_cursor;
        self.items.extend(page.items);
    }

    /// Loads the next page through `fetch`, which receives the cursor to
    /// continue from. Returns how many items were added; nothing is fetched
    /// once the end was reached. A failed fetch leaves the list unchanged.
    pub async fn load_more<F, Fut>(&mut self, fetch: F) -> Result<usize, Error>
    where
        F: FnOnce(Option<Cursor>) -> Fut,
        Fut: Future<Output = Result<Page<T>, Error>>,
    {
        if !self.has_more() {
            return Ok(0);
        }
        let page = fetch(self.next_cursor).await?;
        let added = page.items.len();
        self.push_page(page);
        Ok(added)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Changes every loaded item matching `pred` in place.
    pub fn update_where<P, F>(&mut self, pred: P, mut f: F) -> usize
    where
        P: Fn(&T) -> bool,
        F: FnMut(&mut T),
    {
        let mut changed = 0;
        for item in self.items.iter_mut().filter(|i| pred(i)) {
            f(item);
            changed += 1;
        }
        changed
    }

    /// Removes loaded items matching `pred`, e.g. after a delete.
    pub fn remove_where<P: Fn(&T) -> bool>(&mut self, pred: P) -> usize {
        let before = self.items.len();
        self.items.retain(|i| !pred(i));
        before - self.items.len()
    }
}
