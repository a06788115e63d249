use chrono::{DateTime, Utc};

use crate::core::models::{
    comment::{Comment, Insert as CommentInsert},
    invitation::{Insert as InvitationInsert, Invitation},
    notification::{Insert as NotificationInsert, Notification, Query as NotificationQuery},
    organization::{BillingUpdate, Insert as OrganizationInsert, Member, Membership, Organization, Role, Update as OrganizationUpdate},
    post::{Insert as PostInsert, Post, PostDetail, Query as PostQuery, Update as PostUpdate, View},
    upload_file::{Insert as UploadInsert, UploadedFile},
    user::{Insert as UserInsert, Patch as UserPatch, Profile, User, VerificationToken},
};
use crate::core::pagination::PageRequest;
use crate::error::Error;

// List queries return up to `page.limit()` rows in list order; callers turn
// them into a `Page`.

pub trait UserCommon {
    async fn insert(&mut self, user: UserInsert) -> Result<i32, Error>;
    async fn get(&mut self, id: i32) -> Result<Option<User>, Error>;
    async fn get_by_email(&mut self, email: &str) -> Result<Option<User>, Error>;
    async fn mark_verified(&mut self, id: i32) -> Result<(), Error>;
    async fn patch(&mut self, id: i32, patch: UserPatch) -> Result<(), Error>;
    async fn profile(&mut self, id: i32) -> Result<Option<Profile>, Error>;
}

pub trait VerificationTokenCommon {
    async fn insert(&mut self, token: VerificationToken) -> Result<(), Error>;
    /// Deletes the token and returns it if it existed.
    async fn take(&mut self, token: &str) -> Result<Option<VerificationToken>, Error>;
}

pub trait OrganizationCommon {
    async fn insert(&mut self, data: OrganizationInsert) -> Result<i32, Error>;
    async fn get(&mut self, id: i32) -> Result<Option<Organization>, Error>;
    async fn get_by_customer(&mut self, customer_id: &str) -> Result<Option<Organization>, Error>;
    async fn get_by_subscription(&mut self, subscription_id: &str) -> Result<Option<Organization>, Error>;
    async fn update(&mut self, id: i32, data: OrganizationUpdate) -> Result<(), Error>;
    async fn update_billing(&mut self, id: i32, data: BillingUpdate) -> Result<(), Error>;
    async fn delete(&mut self, id: i32) -> Result<(), Error>;
    async fn slug_exists(&mut self, slug: &str) -> Result<bool, Error>;
    async fn query_by_member(&mut self, uid: i32, page: &PageRequest) -> Result<Vec<Membership>, Error>;
}

pub trait MembershipCommon {
    async fn add_member(&mut self, org_id: i32, uid: i32, role: Role) -> Result<(), Error>;
    async fn role_of(&mut self, org_id: i32, uid: i32) -> Result<Option<Role>, Error>;
    async fn set_role(&mut self, org_id: i32, uid: i32, role: Role) -> Result<(), Error>;
    async fn remove_member(&mut self, org_id: i32, uid: i32) -> Result<bool, Error>;
    async fn count_members(&mut self, org_id: i32) -> Result<i64, Error>;
    async fn count_owners(&mut self, org_id: i32) -> Result<i64, Error>;
    async fn members(&mut self, org_id: i32, page: &PageRequest) -> Result<Vec<Member>, Error>;
}

pub trait InvitationCommon {
    async fn insert(&mut self, invitation: InvitationInsert) -> Result<i32, Error>;
    async fn take_by_token(&mut self, token: &str) -> Result<Option<Invitation>, Error>;
    async fn list(&mut self, org_id: i32) -> Result<Vec<Invitation>, Error>;
    async fn count_pending(&mut self, org_id: i32, now: DateTime<Utc>) -> Result<i64, Error>;
    async fn delete(&mut self, org_id: i32, id: i32) -> Result<bool, Error>;
}

pub trait PostCommon {
    async fn insert(&mut self, post: PostInsert) -> Result<i32, Error>;
    async fn get(&mut self, id: i32) -> Result<Option<Post>, Error>;
    async fn detail(&mut self, id: i32, viewer: Option<i32>) -> Result<Option<PostDetail>, Error>;
    async fn query(&mut self, query: &PostQuery, viewer: Option<i32>, page: &PageRequest) -> Result<Vec<PostDetail>, Error>;
    async fn bookmarked(&mut self, uid: i32, page: &PageRequest) -> Result<Vec<PostDetail>, Error>;
    async fn update(&mut self, id: i32, data: PostUpdate) -> Result<(), Error>;
    async fn delete(&mut self, id: i32) -> Result<(), Error>;
    /// Returns false when the view was already recorded.
    async fn record_view(&mut self, view: View) -> Result<bool, Error>;
}

pub trait CommentCommon {
    async fn insert(&mut self, comment: CommentInsert) -> Result<i32, Error>;
    async fn get(&mut self, id: i32) -> Result<Option<Comment>, Error>;
    async fn query(&mut self, post_id: i32, page: &PageRequest) -> Result<Vec<Comment>, Error>;
    async fn delete(&mut self, id: i32) -> Result<(), Error>;
}

pub trait ReactionCommon {
    /// Returns false when the like already existed.
    async fn insert_like(&mut self, post_id: i32, uid: i32) -> Result<bool, Error>;
    async fn delete_like(&mut self, post_id: i32, uid: i32) -> Result<bool, Error>;
    async fn like_count(&mut self, post_id: i32) -> Result<i64, Error>;
    async fn insert_bookmark(&mut self, post_id: i32, uid: i32) -> Result<bool, Error>;
    async fn delete_bookmark(&mut self, post_id: i32, uid: i32) -> Result<bool, Error>;
    async fn insert_follow(&mut self, follower_id: i32, followee_id: i32) -> Result<bool, Error>;
    async fn delete_follow(&mut self, follower_id: i32, followee_id: i32) -> Result<bool, Error>;
    async fn follower_count(&mut self, uid: i32) -> Result<i64, Error>;
    async fn is_following(&mut self, follower_id: i32, followee_id: i32) -> Result<bool, Error>;
}

pub trait NotificationCommon {
    async fn insert(&mut self, notification: NotificationInsert) -> Result<i32, Error>;
    async fn query(&mut self, query: &NotificationQuery, page: &PageRequest) -> Result<Vec<Notification>, Error>;
    async fn unread_count(&mut self, recipient_id: i32) -> Result<i64, Error>;
    /// Whether an unread notification with the same recipient, actor, kind and post exists.
    async fn has_unread(&mut self, notification: &NotificationInsert) -> Result<bool, Error>;
    /// Marks the given notifications (all when `ids` is `None`) as read.
    async fn mark_read(&mut self, recipient_id: i32, ids: Option<Vec<i32>>) -> Result<u64, Error>;
    async fn delete(&mut self, recipient_id: i32, id: i32) -> Result<bool, Error>;
}

pub trait UploadCommon {
    async fn insert(&mut self, file: UploadInsert) -> Result<i32, Error>;
    async fn get_by_name(&mut self, name: &str) -> Result<Option<UploadedFile>, Error>;
}

pub trait Common:
    UserCommon
    + VerificationTokenCommon
    + OrganizationCommon
    + MembershipCommon
    + InvitationCommon
    + PostCommon
    + CommentCommon
    + ReactionCommon
    + NotificationCommon
    + UploadCommon
{
}

pub trait Store: Common {}

pub trait TxStore: Store {
    async fn commit(self) -> Result<(), Error>;
    async fn rollback(self) -> Result<(), Error>;
}

/// Hands out plain and transactional stores.
pub trait Manager: 'static {
    type Store: Store;
    type TxStore: TxStore;
    async fn db(&self) -> Result<Self::Store, Error>;
    async fn tx(&self) -> Result<Self::TxStore, Error>;
}
