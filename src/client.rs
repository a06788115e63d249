//! Client-side data layer: a keyed query cache with optimistic mutations,
//! toggle helpers for likes, bookmarks and follows, infinite lists and an
//! HTTP client for the endpoints they call.

pub mod api;
pub mod infinite;
pub mod query_cache;
pub mod toggles;

pub use api::{ApiClient, ReactionApi};
pub use infinite::InfiniteList;
pub use query_cache::QueryCache;
pub use toggles::{BookmarkState, FollowState, LikeState, Toggle};
