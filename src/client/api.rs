use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::core::models::post::PostDetail;
use crate::core::models::reaction::{BookmarkStatus, FollowStatus, LikeStatus};
use crate::core::pagination::{Cursor, Page};
use crate::error::Error;

/// The reaction endpoints the toggle helpers call.
pub trait ReactionApi {
    async fn like(&self, post_id: i32) -> Result<LikeStatus, Error>;
    async fn unlike(&self, post_id: i32) -> Result<LikeStatus, Error>;
    async fn bookmark(&self, post_id: i32) -> Result<BookmarkStatus, Error>;
    async fn unbookmark(&self, post_id: i32) -> Result<BookmarkStatus, Error>;
    async fn follow(&self, user_id: i32) -> Result<FollowStatus, Error>;
    async fn unfollow(&self, user_id: i32) -> Result<FollowStatus, Error>;
}

/// Talks to the HTTP API with a session token sent as a bearer token.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            session,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self.client.request(method, format!("{}{}", self.base_url, path));
        match &self.session {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send<T: DeserializeOwned>(&self, method: Method, path: &str) -> Result<T, Error> {
        let resp = self.request(method, path).send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }

    /// One page of the public feed, or of one author's posts.
    pub async fn feed(&self, author_id: Option<i32>, cursor: Option<Cursor>, size: i64) -> Result<Page<PostDetail>, Error> {
        let mut query = vec![("size", size.to_string())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.encode()));
        }
        if let Some(author_id) = author_id {
            query.push(("author_id", author_id.to_string()));
        }
        let resp = self.request(Method::GET, "/posts").query(&query).send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }

    pub async fn bookmarks(&self, cursor: Option<Cursor>, size: i64) -> Result<Page<PostDetail>, Error> {
        let mut query = vec![("size", size.to_string())];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.encode()));
        }
        let resp = self.request(Method::GET, "/bookmarks").query(&query).send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }
}

impl ReactionApi for ApiClient {
    async fn like(&self, post_id: i32) -> Result<LikeStatus, Error> {
        self.send(Method::POST, &format!("/posts/{}/like", post_id)).await
    }

    async fn unlike(&self, post_id: i32) -> Result<LikeStatus, Error> {
        self.send(Method::DELETE, &format!("/posts/{}/like", post_id)).await
    }

    async fn bookmark(&self, post_id: i32) -> Result<BookmarkStatus, Error> {
        self.send(Method::POST, &format!("/posts/{}/bookmark", post_id)).await
    }

    async fn unbookmark(&self, post_id: i32) -> Result<BookmarkStatus, Error> {
        self.send(Method::DELETE, &format!("/posts/{}/bookmark", post_id)).await
    }

    async fn follow(&self, user_id: i32) -> Result<FollowStatus, Error> {
        self.send(Method::POST, &format!("/users/{}/follow", user_id)).await
    }

    async fn unfollow(&self, user_id: i32) -> Result<FollowStatus, Error> {
        self.send(Method::DELETE, &format!("/users/{}/follow", user_id)).await
    }
}
