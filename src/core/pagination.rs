//! Cursor pagination shared by every list endpoint.
//!
//! A list query fetches `size + 1` rows ordered by `(created_at, id)`. When
//! the extra row comes back it is dropped from the page and its key becomes
//! the next cursor. The cursor bound is inclusive, so the next page starts
//! exactly at that row. The cursor carries the ordering key itself rather
//! than a row reference: deleting the row it was taken from does not break
//! traversal.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use itertools::Itertools;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::Error;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cursor {
    pub created_at: DateTime<Utc>,
    pub id: i32,
}

impl Cursor {
    pub fn new(created_at: DateTime<Utc>, id: i32) -> Self {
        Self { created_at, id }
    }

    pub fn encode(&self) -> String {
        hex::encode(format!("{}:{}", self.created_at.timestamp_micros(), self.id))
    }

    pub fn decode(s: &str) -> Result<Self, Error> {
        let invalid = || Error::bad_request("invalid cursor");
        let raw = hex::decode(s).map_err(|_| invalid())?;
        let raw = String::from_utf8(raw).map_err(|_| invalid())?;
        let (micros, id) = raw.split_once(':').ok_or_else(invalid)?;
        let micros: i64 = micros.parse().map_err(|_| invalid())?;
        let id: i32 = id.parse().map_err(|_| invalid())?;
        let created_at = Utc
            .timestamp_opt(micros.div_euclid(1_000_000), (micros.rem_euclid(1_000_000) * 1_000) as u32)
            .single()
            .ok_or_else(invalid)?;
        Ok(Self { created_at, id })
    }

    fn key(&self) -> (DateTime<Utc>, i32) {
        (self.created_at, self.id)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl Serialize for Cursor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

impl<'de> Deserialize<'de> for Cursor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Cursor::decode(&s).map_err(de::Error::custom)
    }
}

/// Anything that can be listed through a cursor.
pub trait Keyed {
    fn cursor(&self) -> Cursor;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    NewestFirst,
    OldestFirst,
}

impl Order {
    pub fn compare(&self, a: &Cursor, b: &Cursor) -> Ordering {
        match self {
            Order::NewestFirst => b.key().cmp(&a.key()),
            Order::OldestFirst => a.key().cmp(&b.key()),
        }
    }

    /// Whether `item` sits at or after `bound` in this order.
    pub fn admits(&self, item: &Cursor, bound: &Cursor) -> bool {
        self.compare(bound, item) != Ordering::Greater
    }

    pub fn sql_cmp(&self) -> &'static str {
        match self {
            Order::NewestFirst => "<=",
            Order::OldestFirst => ">=",
        }
    }

    pub fn sql_dir(&self) -> &'static str {
        match self {
            Order::NewestFirst => "DESC",
            Order::OldestFirst => "ASC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub cursor: Option<Cursor>,
    pub size: i64,
}

impl PageRequest {
    pub fn new(cursor: Option<Cursor>, size: Option<i64>) -> Result<Self, Error> {
        let size = size.unwrap_or(DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&size) {
            return Err(Error::bad_request(format!("page size must be between 1 and {}", MAX_PAGE_SIZE)));
        }
        Ok(Self { cursor, size })
    }

    pub fn first(size: i64) -> Self {
        Self { cursor: None, size }
    }

    pub fn after(cursor: Cursor, size: i64) -> Self {
        Self { cursor: Some(cursor), size }
    }

    /// Rows to fetch: one more than the page holds.
    pub fn limit(&self) -> i64 {
        self.size + 1
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<Cursor>,
}

impl<T: Keyed> Page<T> {
    /// Builds a page from at most `req.limit()` rows already in list order.
    pub fn from_rows(mut rows: Vec<T>, req: &PageRequest) -> Self {
        let size = req.size as usize;
        let next_cursor = if rows.len() > size {
            rows.truncate(size + 1);
            rows.pop().map(|extra| extra.cursor())
        } else {
            None
        };
        Self { items: rows, next_cursor }
    }
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}

/// Sorts `items`, applies the cursor bound and keeps `req.limit()` rows.
/// The in-memory counterpart of `ORDER BY .. WHERE (created_at, id) <= .. LIMIT ..`.
pub fn window<T: Keyed>(items: impl IntoIterator<Item = T>, order: Order, req: &PageRequest) -> Vec<T> {
    items
        .into_iter()
        .filter(|item| match &req.cursor {
            Some(bound) => order.admits(&item.cursor(), bound),
            None => true,
        })
        .sorted_by(|a, b| order.compare(&a.cursor(), &b.cursor()))
        .take(req.limit() as usize)
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Duration;

    #[derive(Debug, Clone, PartialEq)]
    struct Row(Cursor);

    impl Keyed for Row {
        fn cursor(&self) -> Cursor {
            self.0
        }
    }

    fn rows(n: i32) -> Vec<Row> {
        let base = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        (1..=n).map(|i| Row(Cursor::new(base + Duration::seconds(i as i64), i))).collect()
    }

    fn collect_all(all: &[Row], order: Order, size: i64) -> Vec<i32> {
        let mut seen = Vec::new();
        let mut req = PageRequest::first(size);
        loop {
            let page = Page::from_rows(window(all.to_vec(), order, &req), &req);
            assert!(page.items.len() as i64 <= size);
            seen.extend(page.items.iter().map(|r| r.0.id));
            match page.next_cursor {
                Some(c) => req = PageRequest::after(c, size),
                None => break,
            }
        }
        seen
    }

    #[test]
    fn test_cursor_round_trip() {
        let c = Cursor::new(Utc.timestamp_opt(1_700_000_000, 123_456_000).unwrap(), 42);
        assert_eq!(Cursor::decode(&c.encode()).unwrap(), c);
    }

    #[test]
    fn test_malformed_cursor() {
        assert!(matches!(Cursor::decode("zz"), Err(Error::BadRequest(_))));
        assert!(matches!(Cursor::decode(&hex::encode("no-colon")), Err(Error::BadRequest(_))));
        assert!(matches!(Cursor::decode(&hex::encode("12:abc")), Err(Error::BadRequest(_))));
    }

    #[test]
    fn test_page_size_bounds() {
        assert_eq!(PageRequest::new(None, None).unwrap().size, DEFAULT_PAGE_SIZE);
        assert!(PageRequest::new(None, Some(0)).is_err());
        assert!(PageRequest::new(None, Some(MAX_PAGE_SIZE + 1)).is_err());
        assert_eq!(PageRequest::new(None, Some(3)).unwrap().limit(), 4);
    }

    #[test]
    fn test_last_page_has_no_cursor() {
        let all = rows(3);
        let req = PageRequest::first(3);
        let page = Page::from_rows(window(all, Order::NewestFirst, &req), &req);
        assert_eq!(page.items.len(), 3);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn test_extra_row_becomes_cursor() {
        let all = rows(5);
        let req = PageRequest::first(2);
        let page = Page::from_rows(window(all, Order::NewestFirst, &req), &req);
        assert_eq!(page.items.iter().map(|r| r.0.id).collect::<Vec<_>>(), vec![5, 4]);
        assert_eq!(page.next_cursor.map(|c| c.id), Some(3));
    }

    #[test]
    fn test_traversal_visits_each_row_once() {
        let all = rows(7);
        assert_eq!(collect_all(&all, Order::NewestFirst, 3), vec![7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(collect_all(&all, Order::OldestFirst, 2), vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_ties_broken_by_id() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let all: Vec<Row> = (1..=5).map(|i| Row(Cursor::new(at, i))).collect();
        assert_eq!(collect_all(&all, Order::NewestFirst, 2), vec![5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_deleted_cursor_row_keeps_cursor_valid() {
        let mut all = rows(6);
        let req = PageRequest::first(2);
        let page = Page::from_rows(window(all.clone(), Order::NewestFirst, &req), &req);
        let cursor = page.next_cursor.unwrap();
        all.retain(|r| r.0.id != cursor.id);
        let req = PageRequest::after(cursor, 2);
        let page = Page::from_rows(window(all, Order::NewestFirst, &req), &req);
        assert_eq!(page.items.iter().map(|r| r.0.id).collect::<Vec<_>>(), vec![3, 2]);
    }

    #[test]
    fn test_cursor_serializes_as_string() {
        let page: Page<i32> = Page {
            items: vec![],
            next_cursor: Some(Cursor::new(Utc.timestamp_opt(1, 0).unwrap(), 9)),
        };
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["next_cursor"], hex::encode("1000000:9"));
    }
}
