//! Process-local store. A transaction holds the state lock from `tx()` until
//! commit or rollback and works on a copy that replaces the shared state on
//! commit. Other stores wait for the lock meanwhile, so a store must not be
//! used from the task that has a transaction open.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::core::models::{
    comment::{Comment, Insert as CommentInsert},
    invitation::{Insert as InvitationInsert, Invitation},
    notification::{Insert as NotificationInsert, Notification, Query as NotificationQuery},
    organization::{BillingUpdate, Insert as OrganizationInsert, Member, Membership, Organization, Plan, Role, Update as OrganizationUpdate},
    post::{Insert as PostInsert, Post, PostDetail, Query as PostQuery, Update as PostUpdate, View},
    upload_file::{Insert as UploadInsert, UploadedFile},
    user::{Insert as UserInsert, Patch as UserPatch, Profile, User, VerificationToken},
};
use crate::core::pagination::{window, Order, PageRequest};
use crate::core::ports::repository::{
    Common, CommentCommon, InvitationCommon, Manager, MembershipCommon, NotificationCommon, OrganizationCommon, PostCommon, ReactionCommon, Store, TxStore,
    UploadCommon, UserCommon, VerificationTokenCommon,
};
use crate::error::Error;

#[derive(Debug, Clone)]
struct MembershipRow {
    org_id: i32,
    user_id: i32,
    role: Role,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CommentRow {
    id: i32,
    post_id: i32,
    author_id: i32,
    content: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct NotificationRow {
    id: i32,
    insert: NotificationInsert,
    read: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct MemState {
    last_id: i32,
    clock: Option<DateTime<Utc>>,
    users: BTreeMap<i32, User>,
    tokens: HashMap<String, VerificationToken>,
    organizations: BTreeMap<i32, Organization>,
    memberships: Vec<MembershipRow>,
    invitations: BTreeMap<i32, Invitation>,
    posts: BTreeMap<i32, Post>,
    comments: BTreeMap<i32, CommentRow>,
    likes: HashSet<(i32, i32)>,
    bookmarks: HashMap<(i32, i32), DateTime<Utc>>,
    follows: HashSet<(i32, i32)>,
    notifications: BTreeMap<i32, NotificationRow>,
    views: HashSet<View>,
    uploads: BTreeMap<i32, UploadedFile>,
}

impl MemState {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn is_member(&self, org_id: i32, uid: i32) -> bool {
        self.memberships.iter().any(|m| m.org_id == org_id && m.user_id == uid)
    }

    /// Whether `viewer` may read the post: drafts only for their author,
    /// organization posts only for members.
    fn can_view(&self, post: &Post, viewer: i32) -> bool {
        (post.published || post.author_id == viewer) && post.organization_id.map_or(true, |o| self.is_member(o, viewer))
    }

    /// Strictly increasing timestamps with database precision.
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now().trunc_subsecs(6);
        let t = match self.clock {
            Some(last) if last >= now => last + Duration::microseconds(1),
            _ => now,
        };
        self.clock = Some(t);
        t
    }

    fn user_name(&self, id: i32) -> (String, Option<String>) {
        self.users.get(&id).map(|u| (u.name.clone(), u.image.clone())).unwrap_or_default()
    }

    fn post_detail(&self, post: &Post, viewer: Option<i32>, sort_at: DateTime<Utc>) -> PostDetail {
        let (author_name, author_image) = self.user_name(post.author_id);
        PostDetail {
            id: post.id,
            author_id: post.author_id,
            author_name,
            author_image,
            organization_id: post.organization_id,
            content: post.content.clone(),
            published: post.published,
            created_at: post.created_at,
            updated_at: post.updated_at,
            like_count: self.likes.iter().filter(|(p, _)| *p == post.id).count() as i64,
            comment_count: self.comments.values().filter(|c| c.post_id == post.id).count() as i64,
            view_count: self.views.iter().filter(|v| v.post_id == post.id).count() as i64,
            liked: viewer.map_or(false, |v| self.likes.contains(&(post.id, v))),
            bookmarked: viewer.map_or(false, |v| self.bookmarks.contains_key(&(post.id, v))),
            sort_at,
        }
    }

    fn comment(&self, row: &CommentRow) -> Comment {
        let (author_name, author_image) = self.user_name(row.author_id);
        Comment {
            id: row.id,
            post_id: row.post_id,
            author_id: row.author_id,
            author_name,
            author_image,
            content: row.content.clone(),
            created_at: row.created_at,
        }
    }

    fn notification(&self, row: &NotificationRow) -> Notification {
        Notification {
            id: row.id,
            recipient_id: row.insert.recipient_id,
            actor_id: row.insert.actor_id,
            actor_name: self.user_name(row.insert.actor_id).0,
            kind: row.insert.kind,
            post_id: row.insert.post_id,
            organization_id: row.insert.organization_id,
            read: row.read,
            created_at: row.created_at,
        }
    }

    fn delete_post(&mut self, id: i32) {
        self.posts.remove(&id);
        self.comments.retain(|_, c| c.post_id != id);
        self.likes.retain(|(p, _)| *p != id);
        self.bookmarks.retain(|(p, _), _| *p != id);
        self.views.retain(|v| v.post_id != id);
        self.notifications.retain(|_, n| n.insert.post_id != Some(id));
    }
}

#[derive(Debug)]
struct Working {
    guard: OwnedMutexGuard<MemState>,
    state: MemState,
}

/// A handle on the shared state, or a transaction holding its lock.
#[derive(Debug)]
pub struct MemStore {
    shared: Arc<Mutex<MemState>>,
    working: Option<Working>,
}

impl MemStore {
    async fn state<R>(&mut self, f: impl FnOnce(&mut MemState) -> R) -> R {
        match &mut self.working {
            Some(working) => f(&mut working.state),
            None => f(&mut *self.shared.lock().await),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemManager {
    shared: Arc<Mutex<MemState>>,
}

impl MemManager {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Manager for MemManager {
    type Store = MemStore;
    type TxStore = MemStore;

    async fn db(&self) -> Result<MemStore, Error> {
        Ok(MemStore {
            shared: self.shared.clone(),
            working: None,
        })
    }

    async fn tx(&self) -> Result<MemStore, Error> {
        let guard = self.shared.clone().lock_owned().await;
        let state = guard.clone();
        Ok(MemStore {
            shared: self.shared.clone(),
            working: Some(Working { guard, state }),
        })
    }
}

impl UserCommon for MemStore {
    async fn insert(&mut self, user: UserInsert) -> Result<i32, Error> {
        self.state(|s| {
            if s.users.values().any(|u| u.email == user.email) {
                return Err(Error::bad_request("email already registered"));
            }
            let id = s.next_id();
            let created_at = s.tick();
            s.users.insert(
                id,
                User {
                    id,
                    name: user.name,
                    email: user.email,
                    password: user.password,
                    salt: user.salt,
                    email_verified: user.email_verified,
                    bio: None,
                    image: None,
                    created_at,
                },
            );
            Ok(id)
        })
        .await
    }

    async fn get(&mut self, id: i32) -> Result<Option<User>, Error> {
        Ok(self.state(|s| s.users.get(&id).cloned()).await)
    }

    async fn get_by_email(&mut self, email: &str) -> Result<Option<User>, Error> {
        Ok(self.state(|s| s.users.values().find(|u| u.email == email).cloned()).await)
    }

    async fn mark_verified(&mut self, id: i32) -> Result<(), Error> {
        self.state(|s| {
            if let Some(u) = s.users.get_mut(&id) {
                u.email_verified = true;
            }
        })
        .await;
        Ok(())
    }

    async fn patch(&mut self, id: i32, patch: UserPatch) -> Result<(), Error> {
        self.state(|s| {
            if let Some(u) = s.users.get_mut(&id) {
                if let Some(name) = patch.name {
                    u.name = name;
                }
                if patch.bio.is_some() {
                    u.bio = patch.bio;
                }
                if patch.image.is_some() {
                    u.image = patch.image;
                }
            }
        })
        .await;
        Ok(())
    }

    async fn profile(&mut self, id: i32) -> Result<Option<Profile>, Error> {
        Ok(self
            .state(|s| {
                s.users.get(&id).map(|u| Profile {
                    id: u.id,
                    name: u.name.clone(),
                    bio: u.bio.clone(),
                    image: u.image.clone(),
                    follower_count: s.follows.iter().filter(|(_, followee)| *followee == id).count() as i64,
                    following_count: s.follows.iter().filter(|(follower, _)| *follower == id).count() as i64,
                    post_count: s.posts.values().filter(|p| p.author_id == id && p.published && p.organization_id.is_none()).count() as i64,
                })
            })
            .await)
    }
}

impl VerificationTokenCommon for MemStore {
    async fn insert(&mut self, token: VerificationToken) -> Result<(), Error> {
        self.state(|s| s.tokens.insert(token.token.clone(), token)).await;
        Ok(())
    }

    async fn take(&mut self, token: &str) -> Result<Option<VerificationToken>, Error> {
        Ok(self.state(|s| s.tokens.remove(token)).await)
    }
}

impl OrganizationCommon for MemStore {
    async fn insert(&mut self, data: OrganizationInsert) -> Result<i32, Error> {
        self.state(|s| {
            if s.organizations.values().any(|o| o.slug == data.slug) {
                return Err(Error::bad_request("slug already taken"));
            }
            let id = s.next_id();
            let created_at = s.tick();
            s.organizations.insert(
                id,
                Organization {
                    id,
                    name: data.name,
                    slug: data.slug,
                    plan: Plan::Free,
                    stripe_customer_id: None,
                    stripe_subscription_id: None,
                    subscription_status: None,
                    current_period_end: None,
                    created_at,
                },
            );
            Ok(id)
        })
        .await
    }

    async fn get(&mut self, id: i32) -> Result<Option<Organization>, Error> {
        Ok(self.state(|s| s.organizations.get(&id).cloned()).await)
    }

    async fn get_by_customer(&mut self, customer_id: &str) -> Result<Option<Organization>, Error> {
        Ok(self
            .state(|s| s.organizations.values().find(|o| o.stripe_customer_id.as_deref() == Some(customer_id)).cloned())
            .await)
    }

    async fn get_by_subscription(&mut self, subscription_id: &str) -> Result<Option<Organization>, Error> {
        Ok(self
            .state(|s| s.organizations.values().find(|o| o.stripe_subscription_id.as_deref() == Some(subscription_id)).cloned())
            .await)
    }

    async fn update(&mut self, id: i32, data: OrganizationUpdate) -> Result<(), Error> {
        self.state(|s| {
            if let Some(o) = s.organizations.get_mut(&id) {
                o.name = data.name;
            }
        })
        .await;
        Ok(())
    }

    async fn update_billing(&mut self, id: i32, data: BillingUpdate) -> Result<(), Error> {
        self.state(|s| {
            if let Some(o) = s.organizations.get_mut(&id) {
                if let Some(plan) = data.plan {
                    o.plan = plan;
                }
                if data.stripe_customer_id.is_some() {
                    o.stripe_customer_id = data.stripe_customer_id;
                }
                if data.stripe_subscription_id.is_some() {
                    o.stripe_subscription_id = data.stripe_subscription_id;
                }
                if data.subscription_status.is_some() {
                    o.subscription_status = data.subscription_status;
                }
                if data.current_period_end.is_some() {
                    o.current_period_end = data.current_period_end;
                }
            }
        })
        .await;
        Ok(())
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        self.state(|s| {
            s.organizations.remove(&id);
            s.memberships.retain(|m| m.org_id != id);
            s.invitations.retain(|_, i| i.organization_id != id);
            s.notifications.retain(|_, n| n.insert.organization_id != Some(id));
            let posts: Vec<i32> = s.posts.values().filter(|p| p.organization_id == Some(id)).map(|p| p.id).collect();
            for p in posts {
                s.delete_post(p);
            }
        })
        .await;
        Ok(())
    }

    async fn slug_exists(&mut self, slug: &str) -> Result<bool, Error> {
        Ok(self.state(|s| s.organizations.values().any(|o| o.slug == slug)).await)
    }

    async fn query_by_member(&mut self, uid: i32, page: &PageRequest) -> Result<Vec<Membership>, Error> {
        Ok(self
            .state(|s| {
                let rows = s.memberships.iter().filter(|m| m.user_id == uid).filter_map(|m| {
                    s.organizations.get(&m.org_id).map(|o| Membership {
                        id: o.id,
                        name: o.name.clone(),
                        slug: o.slug.clone(),
                        plan: o.plan,
                        role: m.role,
                        member_count: s.memberships.iter().filter(|x| x.org_id == o.id).count() as i64,
                        joined_at: m.created_at,
                    })
                });
                window(rows, Order::NewestFirst, page)
            })
            .await)
    }
}

impl MembershipCommon for MemStore {
    async fn add_member(&mut self, org_id: i32, uid: i32, role: Role) -> Result<(), Error> {
        self.state(|s| {
            if s.memberships.iter().any(|m| m.org_id == org_id && m.user_id == uid) {
                return Err(Error::bad_request("already a member"));
            }
            let created_at = s.tick();
            s.memberships.push(MembershipRow {
                org_id,
                user_id: uid,
                role,
                created_at,
            });
            Ok(())
        })
        .await
    }

    async fn role_of(&mut self, org_id: i32, uid: i32) -> Result<Option<Role>, Error> {
        Ok(self
            .state(|s| s.memberships.iter().find(|m| m.org_id == org_id && m.user_id == uid).map(|m| m.role))
            .await)
    }

    async fn set_role(&mut self, org_id: i32, uid: i32, role: Role) -> Result<(), Error> {
        self.state(|s| {
            if let Some(m) = s.memberships.iter_mut().find(|m| m.org_id == org_id && m.user_id == uid) {
                m.role = role;
            }
        })
        .await;
        Ok(())
    }

    async fn remove_member(&mut self, org_id: i32, uid: i32) -> Result<bool, Error> {
        Ok(self
            .state(|s| {
                let before = s.memberships.len();
                s.memberships.retain(|m| !(m.org_id == org_id && m.user_id == uid));
                before != s.memberships.len()
            })
            .await)
    }

    async fn count_members(&mut self, org_id: i32) -> Result<i64, Error> {
        Ok(self.state(|s| s.memberships.iter().filter(|m| m.org_id == org_id).count() as i64).await)
    }

    async fn count_owners(&mut self, org_id: i32) -> Result<i64, Error> {
        Ok(self
            .state(|s| s.memberships.iter().filter(|m| m.org_id == org_id && m.role == Role::Owner).count() as i64)
            .await)
    }

    async fn members(&mut self, org_id: i32, page: &PageRequest) -> Result<Vec<Member>, Error> {
        Ok(self
            .state(|s| {
                let rows = s.memberships.iter().filter(|m| m.org_id == org_id).filter_map(|m| {
                    s.users.get(&m.user_id).map(|u| Member {
                        user_id: u.id,
                        name: u.name.clone(),
                        email: u.email.clone(),
                        image: u.image.clone(),
                        role: m.role,
                        joined_at: m.created_at,
                    })
                });
                window(rows, Order::NewestFirst, page)
            })
            .await)
    }
}

impl InvitationCommon for MemStore {
    async fn insert(&mut self, invitation: InvitationInsert) -> Result<i32, Error> {
        Ok(self
            .state(|s| {
                let id = s.next_id();
                let created_at = s.tick();
                s.invitations.insert(
                    id,
                    Invitation {
                        id,
                        organization_id: invitation.organization_id,
                        email: invitation.email,
                        role: invitation.role,
                        token: invitation.token,
                        inviter_id: invitation.inviter_id,
                        expires_at: invitation.expires_at,
                        created_at,
                    },
                );
                id
            })
            .await)
    }

    async fn take_by_token(&mut self, token: &str) -> Result<Option<Invitation>, Error> {
        Ok(self
            .state(|s| {
                let id = s.invitations.values().find(|i| i.token == token).map(|i| i.id)?;
                s.invitations.remove(&id)
            })
            .await)
    }

    async fn list(&mut self, org_id: i32) -> Result<Vec<Invitation>, Error> {
        Ok(self
            .state(|s| s.invitations.values().rev().filter(|i| i.organization_id == org_id).cloned().collect())
            .await)
    }

    async fn count_pending(&mut self, org_id: i32, now: DateTime<Utc>) -> Result<i64, Error> {
        Ok(self
            .state(|s| s.invitations.values().filter(|i| i.organization_id == org_id && !i.is_expired(now)).count() as i64)
            .await)
    }

    async fn delete(&mut self, org_id: i32, id: i32) -> Result<bool, Error> {
        Ok(self
            .state(|s| match s.invitations.get(&id) {
                Some(i) if i.organization_id == org_id => s.invitations.remove(&id).is_some(),
                _ => false,
            })
            .await)
    }
}

impl PostCommon for MemStore {
    async fn insert(&mut self, post: PostInsert) -> Result<i32, Error> {
        Ok(self
            .state(|s| {
                let id = s.next_id();
                let now = s.tick();
                s.posts.insert(
                    id,
                    Post {
                        id,
                        author_id: post.author_id,
                        organization_id: post.organization_id,
                        content: post.content,
                        published: post.published,
                        created_at: now,
                        updated_at: now,
                    },
                );
                id
            })
            .await)
    }

    async fn get(&mut self, id: i32) -> Result<Option<Post>, Error> {
        Ok(self.state(|s| s.posts.get(&id).cloned()).await)
    }

    async fn detail(&mut self, id: i32, viewer: Option<i32>) -> Result<Option<PostDetail>, Error> {
        Ok(self
            .state(|s| s.posts.get(&id).map(|p| s.post_detail(p, viewer, p.created_at)))
            .await)
    }

    async fn query(&mut self, query: &PostQuery, viewer: Option<i32>, page: &PageRequest) -> Result<Vec<PostDetail>, Error> {
        Ok(self
            .state(|s| {
                let rows = s
                    .posts
                    .values()
                    .filter(|p| query.author_id.map_or(true, |a| p.author_id == a))
                    .filter(|p| query.organization_id.map_or(true, |o| p.organization_id == Some(o)))
                    .filter(|p| !query.personal_only || p.organization_id.is_none())
                    .filter(|p| !query.published_only || p.published)
                    .filter(|p| query.followed_by.map_or(true, |f| s.follows.contains(&(f, p.author_id))))
                    .map(|p| s.post_detail(p, viewer, p.created_at));
                window(rows, Order::NewestFirst, page)
            })
            .await)
    }

    async fn bookmarked(&mut self, uid: i32, page: &PageRequest) -> Result<Vec<PostDetail>, Error> {
        Ok(self
            .state(|s| {
                let rows = s
                    .bookmarks
                    .iter()
                    .filter(|((_, u), _)| *u == uid)
                    .filter_map(|((p, _), at)| s.posts.get(p).map(|post| (post, at)))
                    .filter(|(post, _)| s.can_view(post, uid))
                    .map(|(post, at)| s.post_detail(post, Some(uid), *at));
                window(rows, Order::NewestFirst, page)
            })
            .await)
    }

    async fn update(&mut self, id: i32, data: PostUpdate) -> Result<(), Error> {
        self.state(|s| {
            let now = s.tick();
            if let Some(p) = s.posts.get_mut(&id) {
                if let Some(content) = data.content {
                    p.content = content;
                }
                if let Some(published) = data.published {
                    p.published = published;
                }
                p.updated_at = now;
            }
        })
        .await;
        Ok(())
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        self.state(|s| s.delete_post(id)).await;
        Ok(())
    }

    async fn record_view(&mut self, view: View) -> Result<bool, Error> {
        Ok(self.state(|s| s.views.insert(view)).await)
    }
}

impl CommentCommon for MemStore {
    async fn insert(&mut self, comment: CommentInsert) -> Result<i32, Error> {
        Ok(self
            .state(|s| {
                let id = s.next_id();
                let created_at = s.tick();
                s.comments.insert(
                    id,
                    CommentRow {
                        id,
                        post_id: comment.post_id,
                        author_id: comment.author_id,
                        content: comment.content,
                        created_at,
                    },
                );
                id
            })
            .await)
    }

    async fn get(&mut self, id: i32) -> Result<Option<Comment>, Error> {
        Ok(self.state(|s| s.comments.get(&id).map(|c| s.comment(c))).await)
    }

    async fn query(&mut self, post_id: i32, page: &PageRequest) -> Result<Vec<Comment>, Error> {
        Ok(self
            .state(|s| {
                let rows = s.comments.values().filter(|c| c.post_id == post_id).map(|c| s.comment(c));
                window(rows, Order::OldestFirst, page)
            })
            .await)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        self.state(|s| s.comments.remove(&id)).await;
        Ok(())
    }
}

impl ReactionCommon for MemStore {
    async fn insert_like(&mut self, post_id: i32, uid: i32) -> Result<bool, Error> {
        Ok(self.state(|s| s.likes.insert((post_id, uid))).await)
    }

    async fn delete_like(&mut self, post_id: i32, uid: i32) -> Result<bool, Error> {
        Ok(self.state(|s| s.likes.remove(&(post_id, uid))).await)
    }

    async fn like_count(&mut self, post_id: i32) -> Result<i64, Error> {
        Ok(self.state(|s| s.likes.iter().filter(|(p, _)| *p == post_id).count() as i64).await)
    }

    async fn insert_bookmark(&mut self, post_id: i32, uid: i32) -> Result<bool, Error> {
        Ok(self
            .state(|s| {
                if s.bookmarks.contains_key(&(post_id, uid)) {
                    return false;
                }
                let at = s.tick();
                s.bookmarks.insert((post_id, uid), at);
                true
            })
            .await)
    }

    async fn delete_bookmark(&mut self, post_id: i32, uid: i32) -> Result<bool, Error> {
        Ok(self.state(|s| s.bookmarks.remove(&(post_id, uid)).is_some()).await)
    }

    async fn insert_follow(&mut self, follower_id: i32, followee_id: i32) -> Result<bool, Error> {
        Ok(self.state(|s| s.follows.insert((follower_id, followee_id))).await)
    }

    async fn delete_follow(&mut self, follower_id: i32, followee_id: i32) -> Result<bool, Error> {
        Ok(self.state(|s| s.follows.remove(&(follower_id, followee_id))).await)
    }

    async fn follower_count(&mut self, uid: i32) -> Result<i64, Error> {
        Ok(self.state(|s| s.follows.iter().filter(|(_, f)| *f == uid).count() as i64).await)
    }

    async fn is_following(&mut self, follower_id: i32, followee_id: i32) -> Result<bool, Error> {
        Ok(self.state(|s| s.follows.contains(&(follower_id, followee_id))).await)
    }
}

impl NotificationCommon for MemStore {
    async fn insert(&mut self, notification: NotificationInsert) -> Result<i32, Error> {
        Ok(self
            .state(|s| {
                let id = s.next_id();
                let created_at = s.tick();
                s.notifications.insert(
                    id,
                    NotificationRow {
                        id,
                        insert: notification,
                        read: false,
                        created_at,
                    },
                );
                id
            })
            .await)
    }

    async fn query(&mut self, query: &NotificationQuery, page: &PageRequest) -> Result<Vec<Notification>, Error> {
        Ok(self
            .state(|s| {
                let rows = s
                    .notifications
                    .values()
                    .filter(|n| n.insert.recipient_id == query.recipient_id)
                    .filter(|n| !query.unread_only || !n.read)
                    .map(|n| s.notification(n));
                window(rows, Order::NewestFirst, page)
            })
            .await)
    }

    async fn unread_count(&mut self, recipient_id: i32) -> Result<i64, Error> {
        Ok(self
            .state(|s| s.notifications.values().filter(|n| n.insert.recipient_id == recipient_id && !n.read).count() as i64)
            .await)
    }

    async fn has_unread(&mut self, n: &NotificationInsert) -> Result<bool, Error> {
        Ok(self
            .state(|s| {
                s.notifications.values().any(|row| {
                    !row.read
                        && row.insert.recipient_id == n.recipient_id
                        && row.insert.actor_id == n.actor_id
                        && row.insert.kind == n.kind
                        && row.insert.post_id == n.post_id
                })
            })
            .await)
    }

    async fn mark_read(&mut self, recipient_id: i32, ids: Option<Vec<i32>>) -> Result<u64, Error> {
        Ok(self
            .state(|s| {
                let mut updated = 0;
                for n in s.notifications.values_mut() {
                    let selected = ids.as_ref().map_or(true, |ids| ids.contains(&n.id));
                    if n.insert.recipient_id == recipient_id && !n.read && selected {
                        n.read = true;
                        updated += 1;
                    }
                }
                updated
            })
            .await)
    }

    async fn delete(&mut self, recipient_id: i32, id: i32) -> Result<bool, Error> {
        Ok(self
            .state(|s| match s.notifications.get(&id) {
                Some(n) if n.insert.recipient_id == recipient_id => s.notifications.remove(&id).is_some(),
                _ => false,
            })
            .await)
    }
}

impl UploadCommon for MemStore {
    async fn insert(&mut self, file: UploadInsert) -> Result<i32, Error> {
        Ok(self
            .state(|s| {
                let id = s.next_id();
                let created_at = s.tick();
                s.uploads.insert(
                    id,
                    UploadedFile {
                        id,
                        owner_id: file.owner_id,
                        name: file.name,
                        extension: file.extension,
                        size: file.size,
                        created_at,
                    },
                );
                id
            })
            .await)
    }

    async fn get_by_name(&mut self, name: &str) -> Result<Option<UploadedFile>, Error> {
        Ok(self.state(|s| s.uploads.values().find(|f| f.name == name).cloned()).await)
    }
}

impl Common for MemStore {}

impl Store for MemStore {}

impl TxStore for MemStore {
    async fn commit(mut self) -> Result<(), Error> {
        if let Some(Working { mut guard, state }) = self.working.take() {
            *guard = state;
        }
        Ok(())
    }

    async fn rollback(mut self) -> Result<(), Error> {
        self.working.take();
        Ok(())
    }
}
