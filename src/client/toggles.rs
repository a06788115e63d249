//! Optimistic toggles. Each state flips the cached value immediately, then
//! reconciles with the server's answer or rolls back when the call fails.

use std::future::Future;

use super::api::ReactionApi;
use super::query_cache::QueryCache;
use crate::core::models::post::PostDetail;
use crate::core::models::reaction::{BookmarkStatus, FollowStatus, LikeStatus};
use crate::error::Error;

pub trait Toggle: Clone {
    fn is_on(&self) -> bool;
    /// The value the server is expected to return after toggling.
    fn toggled(&self) -> Self;
}

impl Toggle for LikeStatus {
    fn is_on(&self) -> bool {
        self.liked
    }

    fn toggled(&self) -> Self {
        Self {
            liked: !self.liked,
            like_count: if self.liked { (self.like_count - 1).max(0) } else { self.like_count + 1 },
        }
    }
}

impl Toggle for BookmarkStatus {
    fn is_on(&self) -> bool {
        self.bookmarked
    }

    fn toggled(&self) -> Self {
        Self { bookmarked: !self.bookmarked }
    }
}

impl Toggle for FollowStatus {
    fn is_on(&self) -> bool {
        self.following
    }

    fn toggled(&self) -> Self {
        Self {
            following: !self.following,
            follower_count: if self.following { (self.follower_count - 1).max(0) } else { self.follower_count + 1 },
        }
    }
}

async fn toggle<S, F, Fut>(cache: &QueryCache<i32, S>, id: i32, what: &str, call: F) -> Result<S, Error>
where
    S: Toggle,
    F: FnOnce(bool) -> Fut,
    Fut: Future<Output = Result<S, Error>>,
{
    cache
        .mutate_with(id, |current| {
            let current = current.ok_or_else(|| Error::not_found(what))?;
            let request = call(current.is_on());
            Ok((current.toggled(), async move { request.await.map(Some) }))
        })
        .await
}

pub struct LikeState<A> {
    api: A,
    cache: QueryCache<i32, LikeStatus>,
}

impl<A: ReactionApi> LikeState<A> {
    pub fn new(api: A) -> Self {
        Self { api, cache: QueryCache::new() }
    }

    /// Seeds the state from posts as they arrive in a list.
    pub async fn seed(&self, posts: &[PostDetail]) {
        for p in posts {
            self.cache
                .set(
                    p.id,
                    LikeStatus {
                        liked: p.liked,
                        like_count: p.like_count,
                    },
                )
                .await;
        }
    }

    pub async fn get(&self, post_id: i32) -> Option<LikeStatus> {
        self.cache.get(&post_id).await
    }

    pub async fn toggle(&self, post_id: i32) -> Result<LikeStatus, Error> {
        let api = &self.api;
        toggle(&self.cache, post_id, "like state", |liked| async move {
            if liked {
                api.unlike(post_id).await
            } else {
                api.like(post_id).await
            }
        })
        .await
    }
}

pub struct BookmarkState<A> {
    api: A,
    cache: QueryCache<i32, BookmarkStatus>,
}

impl<A: ReactionApi> BookmarkState<A> {
    pub fn new(api: A) -> Self {
        Self { api, cache: QueryCache::new() }
    }

    pub async fn seed(&self, posts: &[PostDetail]) {
        for p in posts {
            self.cache.set(p.id, BookmarkStatus { bookmarked: p.bookmarked }).await;
        }
    }

    pub async fn get(&self, post_id: i32) -> Option<BookmarkStatus> {
        self.cache.get(&post_id).await
    }

    pub async fn toggle(&self, post_id: i32) -> Result<BookmarkStatus, Error> {
        let api = &self.api;
        toggle(&self.cache, post_id, "bookmark state", |bookmarked| async move {
            if bookmarked {
                api.unbookmark(post_id).await
            } else {
                api.bookmark(post_id).await
            }
        })
        .await
    }
}

pub struct FollowState<A> {
    api: A,
    cache: QueryCache<i32, FollowStatus>,
}

impl<A: ReactionApi> FollowState<A> {
    pub fn new(api: A) -> Self {
        Self { api, cache: QueryCache::new() }
    }

    pub async fn seed(&self, user_id: i32, status: FollowStatus) {
        self.cache.set(user_id, status).await;
    }

    pub async fn get(&self, user_id: i32) -> Option<FollowStatus> {
        self.cache.get(&user_id).await
    }

    pub async fn toggle(&self, user_id: i32) -> Result<FollowStatus, Error> {
        let api = &self.api;
        toggle(&self.cache, user_id, "follow state", |following| async move {
            if following {
                api.unfollow(user_id).await
            } else {
                api.follow(user_id).await
            }
        })
        .await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Answers like the server would for a post that already has 4 likes
    /// from others, or fails every call when `down` is set.
    #[derive(Default)]
    struct FakeApi {
        down: AtomicBool,
    }

    impl FakeApi {
        fn check(&self) -> Result<(), Error> {
            if self.down.load(Ordering::SeqCst) {
                return Err(Error::Server(anyhow::anyhow!("connection refused")));
            }
            Ok(())
        }
    }

    impl ReactionApi for FakeApi {
        async fn like(&self, _: i32) -> Result<LikeStatus, Error> {
            self.check()?;
            Ok(LikeStatus { liked: true, like_count: 5 })
        }
        async fn unlike(&self, _: i32) -> Result<LikeStatus, Error> {
            self.check()?;
            Ok(LikeStatus { liked: false, like_count: 4 })
        }
        async fn bookmark(&self, _: i32) -> Result<BookmarkStatus, Error> {
            self.check()?;
            Ok(BookmarkStatus { bookmarked: true })
        }
        async fn unbookmark(&self, _: i32) -> Result<BookmarkStatus, Error> {
            self.check()?;
            Ok(BookmarkStatus { bookmarked: false })
        }
        async fn follow(&self, _: i32) -> Result<FollowStatus, Error> {
            self.check()?;
            Ok(FollowStatus {
                following: true,
                follower_count: 10,
            })
        }
        async fn unfollow(&self, _: i32) -> Result<FollowStatus, Error> {
            self.check()?;
            Ok(FollowStatus {
                following: false,
                follower_count: 9,
            })
        }
    }

    fn post(id: i32, liked: bool, like_count: i64) -> PostDetail {
        let now = Utc::now();
        PostDetail {
            id,
            author_id: 1,
            author_name: "ann".into(),
            author_image: None,
            organization_id: None,
            content: "hello".into(),
            published: true,
            created_at: now,
            updated_at: now,
            like_count,
            comment_count: 0,
            view_count: 0,
            liked,
            bookmarked: false,
            sort_at: now,
        }
    }

    #[test]
    fn test_toggled() {
        let s = LikeStatus { liked: false, like_count: 0 };
        assert_eq!(s.toggled(), LikeStatus { liked: true, like_count: 1 });
        assert_eq!(s.toggled().toggled(), s);
        let f = FollowStatus {
            following: true,
            follower_count: 0,
        };
        assert_eq!(f.toggled().follower_count, 0);
    }

    #[tokio::test]
    async fn test_like_toggle_round_trip() {
        let state = LikeState::new(FakeApi::default());
        state.seed(&[post(1, false, 4)]).await;
        assert_eq!(state.toggle(1).await.unwrap(), LikeStatus { liked: true, like_count: 5 });
        assert_eq!(state.toggle(1).await.unwrap(), LikeStatus { liked: false, like_count: 4 });
        assert_eq!(state.get(1).await, Some(LikeStatus { liked: false, like_count: 4 }));
    }

    #[tokio::test]
    async fn test_failed_toggle_rolls_back() {
        let api = FakeApi::default();
        api.down.store(true, Ordering::SeqCst);
        let state = LikeState::new(api);
        state.seed(&[post(1, false, 4)]).await;
        assert!(state.toggle(1).await.is_err());
        assert_eq!(state.get(1).await, Some(LikeStatus { liked: false, like_count: 4 }));
        assert!(matches!(state.toggle(2).await, Err(Error::NotFound(_))));
    }

    /// Records each call and yields once before answering, so two toggles
    /// started together are both in flight at the same time.
    #[derive(Default)]
    struct SlowApi {
        calls: std::sync::Mutex<Vec<&'static str>>,
    }

    impl SlowApi {
        async fn answer<T>(&self, call: &'static str, value: T) -> Result<T, Error> {
            self.calls.lock().unwrap().push(call);
            tokio::task::yield_now().await;
            Ok(value)
        }
    }

    impl ReactionApi for SlowApi {
        async fn like(&self, _: i32) -> Result<LikeStatus, Error> {
            self.answer("like", LikeStatus { liked: true, like_count: 5 }).await
        }
        async fn unlike(&self, _: i32) -> Result<LikeStatus, Error> {
            self.answer("unlike", LikeStatus { liked: false, like_count: 4 }).await
        }
        async fn bookmark(&self, _: i32) -> Result<BookmarkStatus, Error> {
            self.answer("bookmark", BookmarkStatus { bookmarked: true }).await
        }
        async fn unbookmark(&self, _: i32) -> Result<BookmarkStatus, Error> {
            self.answer("unbookmark", BookmarkStatus { bookmarked: false }).await
        }
        async fn follow(&self, _: i32) -> Result<FollowStatus, Error> {
            self.answer(
                "follow",
                FollowStatus {
                    following: true,
                    follower_count: 10,
                },
            )
            .await
        }
        async fn unfollow(&self, _: i32) -> Result<FollowStatus, Error> {
            self.answer(
                "unfollow",
                FollowStatus {
                    following: false,
                    follower_count: 9,
                },
            )
            .await
        }
    }

    #[tokio::test]
    async fn test_overlapping_toggles_alternate() {
        let state = LikeState::new(SlowApi::default());
        state.seed(&[post(1, false, 4)]).await;
        let (first, second) = tokio::join!(state.toggle(1), state.toggle(1));
        assert!(first.unwrap().liked);
        assert!(!second.unwrap().liked);
        assert_eq!(*state.api.calls.lock().unwrap(), vec!["like", "unlike"]);
        assert_eq!(state.get(1).await, Some(LikeStatus { liked: false, like_count: 4 }));
    }

    #[tokio::test]
    async fn test_bookmark_and_follow_toggles() {
        let bookmarks = BookmarkState::new(FakeApi::default());
        bookmarks.seed(&[post(3, false, 0)]).await;
        assert!(bookmarks.toggle(3).await.unwrap().bookmarked);
        assert!(!bookmarks.toggle(3).await.unwrap().bookmarked);

        let follows = FollowState::new(FakeApi::default());
        follows
            .seed(
                7,
                FollowStatus {
                    following: false,
                    follower_count: 9,
                },
            )
            .await;
        assert_eq!(follows.toggle(7).await.unwrap().follower_count, 10);
        assert_eq!(follows.get(7).await.map(|s| s.following), Some(true));
    }
}
