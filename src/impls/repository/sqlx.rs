use chrono::{DateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::{query, query_as, query_scalar, Executor, PgPool, Postgres, QueryBuilder, Transaction};

use crate::core::models::{
    comment::{Comment, Insert as CommentInsert},
    invitation::{Insert as InvitationInsert, Invitation},
    notification::{Insert as NotificationInsert, Notification, Query as NotificationQuery},
    organization::{BillingUpdate, Insert as OrganizationInsert, Member, Membership, Organization, Role, Update as OrganizationUpdate},
    post::{Insert as PostInsert, Post, PostDetail, Query as PostQuery, Update as PostUpdate, View},
    upload_file::{Insert as UploadInsert, UploadedFile},
    user::{Insert as UserInsert, Patch as UserPatch, Profile, User, VerificationToken},
};
use crate::core::pagination::{Order, PageRequest};
use crate::core::ports::repository::{
    Common, CommentCommon, InvitationCommon, Manager, MembershipCommon, NotificationCommon, OrganizationCommon, PostCommon, ReactionCommon, Store, TxStore,
    UploadCommon, UserCommon, VerificationTokenCommon,
};
use crate::error::Error;

pub struct PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e>,
{
    executor: E,
}

impl<E> PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e>,
{
    pub fn new(executor: E) -> Self {
        Self { executor }
    }
}

/// Appends the cursor bound, ordering and `LIMIT size + 1` to a query whose
/// `WHERE` clause is already open.
fn push_page(qb: &mut QueryBuilder<'_, Postgres>, sort_col: &str, id_col: &str, order: Order, page: &PageRequest) {
    if let Some(cursor) = &page.cursor {
        qb.push(format!(" AND ({}, {}) {} (", sort_col, id_col, order.sql_cmp()));
        qb.push_bind(cursor.created_at);
        qb.push(", ");
        qb.push_bind(cursor.id);
        qb.push(")");
    }
    qb.push(format!(" ORDER BY {sort} {dir}, {id} {dir} LIMIT ", sort = sort_col, id = id_col, dir = order.sql_dir()));
    qb.push_bind(page.limit());
}

fn post_detail_select<'a>(viewer: Option<i32>, sort_col: &str) -> QueryBuilder<'a, Postgres> {
    let mut qb = QueryBuilder::new(
        "
        SELECT
            p.id,
            p.author_id,
            u.name AS author_name,
            u.image AS author_image,
            p.organization_id,
            p.content,
            p.published,
            p.created_at,
            p.updated_at,
            (SELECT COUNT(*) FROM likes AS l WHERE l.post_id = p.id) AS like_count,
            (SELECT COUNT(*) FROM comments AS c WHERE c.post_id = p.id) AS comment_count,
            (SELECT COUNT(*) FROM post_views AS v WHERE v.post_id = p.id) AS view_count,
            EXISTS(SELECT 1 FROM likes AS l WHERE l.post_id = p.id AND l.user_id = ",
    );
    qb.push_bind(viewer);
    qb.push(") AS liked, EXISTS(SELECT 1 FROM bookmarks AS b WHERE b.post_id = p.id AND b.user_id = ");
    qb.push_bind(viewer);
    qb.push(format!(") AS bookmarked, {} AS sort_at", sort_col));
    qb
}

impl<E> UserCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, user: UserInsert) -> Result<i32, Error> {
        let id = query_scalar("INSERT INTO users (name, email, password, salt, email_verified) VALUES ($1, $2, $3, $4, $5) RETURNING id")
            .bind(user.name)
            .bind(user.email)
            .bind(user.password)
            .bind(user.salt)
            .bind(user.email_verified)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(id)
    }

    async fn get(&mut self, id: i32) -> Result<Option<User>, Error> {
        let user = query_as("SELECT * FROM users WHERE id = $1").bind(id).fetch_optional(&mut self.executor).await?;
        Ok(user)
    }

    async fn get_by_email(&mut self, email: &str) -> Result<Option<User>, Error> {
        let user = query_as("SELECT * FROM users WHERE email = $1").bind(email).fetch_optional(&mut self.executor).await?;
        Ok(user)
    }

    async fn mark_verified(&mut self, id: i32) -> Result<(), Error> {
        query("UPDATE users SET email_verified = TRUE WHERE id = $1").bind(id).execute(&mut self.executor).await?;
        Ok(())
    }

    async fn patch(&mut self, id: i32, patch: UserPatch) -> Result<(), Error> {
        query("UPDATE users SET name = COALESCE($1, name), bio = COALESCE($2, bio), image = COALESCE($3, image) WHERE id = $4")
            .bind(patch.name)
            .bind(patch.bio)
            .bind(patch.image)
            .bind(id)
            .execute(&mut self.executor)
            .await?;
        Ok(())
    }

    async fn profile(&mut self, id: i32) -> Result<Option<Profile>, Error> {
        let profile = query_as(
            "
        SELECT
            u.id,
            u.name,
            u.bio,
            u.image,
            (SELECT COUNT(*) FROM follows AS f WHERE f.followee_id = u.id) AS follower_count,
            (SELECT COUNT(*) FROM follows AS f WHERE f.follower_id = u.id) AS following_count,
            (SELECT COUNT(*) FROM posts AS p WHERE p.author_id = u.id AND p.published AND p.organization_id IS NULL) AS post_count
        FROM users AS u
        WHERE u.id = $1",
        )
        .bind(id)
        .fetch_optional(&mut self.executor)
        .await?;
        Ok(profile)
    }
}

impl<E> VerificationTokenCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, token: VerificationToken) -> Result<(), Error> {
        query("INSERT INTO verification_tokens (identifier, token, expires_at) VALUES ($1, $2, $3)")
            .bind(token.identifier)
            .bind(token.token)
            .bind(token.expires_at)
            .execute(&mut self.executor)
            .await?;
        Ok(())
    }

    async fn take(&mut self, token: &str) -> Result<Option<VerificationToken>, Error> {
        let token = query_as("DELETE FROM verification_tokens WHERE token = $1 RETURNING identifier, token, expires_at")
            .bind(token)
            .fetch_optional(&mut self.executor)
            .await?;
        Ok(token)
    }
}

impl<E> OrganizationCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, data: OrganizationInsert) -> Result<i32, Error> {
        let id = query_scalar("INSERT INTO organizations (name, slug) VALUES ($1, $2) RETURNING id")
            .bind(data.name)
            .bind(data.slug)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(id)
    }

    async fn get(&mut self, id: i32) -> Result<Option<Organization>, Error> {
        let org = query_as("SELECT * FROM organizations WHERE id = $1").bind(id).fetch_optional(&mut self.executor).await?;
        Ok(org)
    }

    async fn get_by_customer(&mut self, customer_id: &str) -> Result<Option<Organization>, Error> {
        let org = query_as("SELECT * FROM organizations WHERE stripe_customer_id = $1")
            .bind(customer_id)
            .fetch_optional(&mut self.executor)
            .await?;
        Ok(org)
    }

    async fn get_by_subscription(&mut self, subscription_id: &str) -> Result<Option<Organization>, Error> {
        let org = query_as("SELECT * FROM organizations WHERE stripe_subscription_id = $1")
            .bind(subscription_id)
            .fetch_optional(&mut self.executor)
            .await?;
        Ok(org)
    }

    async fn update(&mut self, id: i32, data: OrganizationUpdate) -> Result<(), Error> {
        query("UPDATE organizations SET name = $1 WHERE id = $2")
            .bind(data.name)
            .bind(id)
            .execute(&mut self.executor)
            .await?;
        Ok(())
    }

    async fn update_billing(&mut self, id: i32, data: BillingUpdate) -> Result<(), Error> {
        query(
            "
        UPDATE organizations SET
            plan = COALESCE($1, plan),
            stripe_customer_id = COALESCE($2, stripe_customer_id),
            stripe_subscription_id = COALESCE($3, stripe_subscription_id),
            subscription_status = COALESCE($4, subscription_status),
            current_period_end = COALESCE($5, current_period_end)
        WHERE id = $6",
        )
        .bind(data.plan)
        .bind(data.stripe_customer_id)
        .bind(data.stripe_subscription_id)
        .bind(data.subscription_status)
        .bind(data.current_period_end)
        .bind(id)
        .execute(&mut self.executor)
        .await?;
        Ok(())
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        query("DELETE FROM organizations WHERE id = $1").bind(id).execute(&mut self.executor).await?;
        Ok(())
    }

    async fn slug_exists(&mut self, slug: &str) -> Result<bool, Error> {
        let exists = query_scalar("SELECT EXISTS(SELECT * FROM organizations WHERE slug = $1)")
            .bind(slug)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(exists)
    }

    async fn query_by_member(&mut self, uid: i32, page: &PageRequest) -> Result<Vec<Membership>, Error> {
        let mut qb = QueryBuilder::new(
            "
        SELECT
            o.id,
            o.name,
            o.slug,
            o.plan,
            m.role,
            (SELECT COUNT(*) FROM organization_memberships AS x WHERE x.organization_id = o.id) AS member_count,
            m.created_at AS joined_at
        FROM organization_memberships AS m
        JOIN organizations AS o ON m.organization_id = o.id
        WHERE m.user_id = ",
        );
        qb.push_bind(uid);
        push_page(&mut qb, "m.created_at", "o.id", Order::NewestFirst, page);
        let list = qb.build_query_as().fetch_all(&mut self.executor).await?;
        Ok(list)
    }
}

impl<E> MembershipCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn add_member(&mut self, org_id: i32, uid: i32, role: Role) -> Result<(), Error> {
        query("INSERT INTO organization_memberships (organization_id, user_id, role) VALUES ($1, $2, $3)")
            .bind(org_id)
            .bind(uid)
            .bind(role)
            .execute(&mut self.executor)
            .await?;
        Ok(())
    }

    async fn role_of(&mut self, org_id: i32, uid: i32) -> Result<Option<Role>, Error> {
        let role = query_scalar("SELECT role FROM organization_memberships WHERE organization_id = $1 AND user_id = $2")
            .bind(org_id)
            .bind(uid)
            .fetch_optional(&mut self.executor)
            .await?;
        Ok(role)
    }

    async fn set_role(&mut self, org_id: i32, uid: i32, role: Role) -> Result<(), Error> {
        query("UPDATE organization_memberships SET role = $1 WHERE organization_id = $2 AND user_id = $3")
            .bind(role)
            .bind(org_id)
            .bind(uid)
            .execute(&mut self.executor)
            .await?;
        Ok(())
    }

    async fn remove_member(&mut self, org_id: i32, uid: i32) -> Result<bool, Error> {
        let res = query("DELETE FROM organization_memberships WHERE organization_id = $1 AND user_id = $2")
            .bind(org_id)
            .bind(uid)
            .execute(&mut self.executor)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn count_members(&mut self, org_id: i32) -> Result<i64, Error> {
        let count = query_scalar("SELECT COUNT(*) FROM organization_memberships WHERE organization_id = $1")
            .bind(org_id)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(count)
    }

    async fn count_owners(&mut self, org_id: i32) -> Result<i64, Error> {
        let count = query_scalar("SELECT COUNT(*) FROM organization_memberships WHERE organization_id = $1 AND role = $2")
            .bind(org_id)
            .bind(Role::Owner)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(count)
    }

    async fn members(&mut self, org_id: i32, page: &PageRequest) -> Result<Vec<Member>, Error> {
        let mut qb = QueryBuilder::new(
            "
        SELECT u.id AS user_id, u.name, u.email, u.image, m.role, m.created_at AS joined_at
        FROM organization_memberships AS m
        JOIN users AS u ON m.user_id = u.id
        WHERE m.organization_id = ",
        );
        qb.push_bind(org_id);
        push_page(&mut qb, "m.created_at", "u.id", Order::NewestFirst, page);
        let list = qb.build_query_as().fetch_all(&mut self.executor).await?;
        Ok(list)
    }
}

impl<E> InvitationCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, invitation: InvitationInsert) -> Result<i32, Error> {
        let id = query_scalar(
            "INSERT INTO invitations (organization_id, email, role, token, inviter_id, expires_at) VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(invitation.organization_id)
        .bind(invitation.email)
        .bind(invitation.role)
        .bind(invitation.token)
        .bind(invitation.inviter_id)
        .bind(invitation.expires_at)
        .fetch_one(&mut self.executor)
        .await?;
        Ok(id)
    }

    async fn take_by_token(&mut self, token: &str) -> Result<Option<Invitation>, Error> {
        let invitation = query_as("DELETE FROM invitations WHERE token = $1 RETURNING *")
            .bind(token)
            .fetch_optional(&mut self.executor)
            .await?;
        Ok(invitation)
    }

    async fn list(&mut self, org_id: i32) -> Result<Vec<Invitation>, Error> {
        let list = query_as("SELECT * FROM invitations WHERE organization_id = $1 ORDER BY id DESC")
            .bind(org_id)
            .fetch_all(&mut self.executor)
            .await?;
        Ok(list)
    }

    async fn count_pending(&mut self, org_id: i32, now: DateTime<Utc>) -> Result<i64, Error> {
        let count = query_scalar("SELECT COUNT(*) FROM invitations WHERE organization_id = $1 AND expires_at > $2")
            .bind(org_id)
            .bind(now)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(count)
    }

    async fn delete(&mut self, org_id: i32, id: i32) -> Result<bool, Error> {
        let res = query("DELETE FROM invitations WHERE organization_id = $1 AND id = $2")
            .bind(org_id)
            .bind(id)
            .execute(&mut self.executor)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

impl<E> PostCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, post: PostInsert) -> Result<i32, Error> {
        let id = query_scalar("INSERT INTO posts (author_id, organization_id, content, published) VALUES ($1, $2, $3, $4) RETURNING id")
            .bind(post.author_id)
            .bind(post.organization_id)
            .bind(post.content)
            .bind(post.published)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(id)
    }

    async fn get(&mut self, id: i32) -> Result<Option<Post>, Error> {
        let post = query_as("SELECT * FROM posts WHERE id = $1").bind(id).fetch_optional(&mut self.executor).await?;
        Ok(post)
    }

    async fn detail(&mut self, id: i32, viewer: Option<i32>) -> Result<Option<PostDetail>, Error> {
        let mut qb = post_detail_select(viewer, "p.created_at");
        qb.push(" FROM posts AS p JOIN users AS u ON p.author_id = u.id WHERE p.id = ");
        qb.push_bind(id);
        let post = qb.build_query_as().fetch_optional(&mut self.executor).await?;
        Ok(post)
    }

    async fn query(&mut self, q: &PostQuery, viewer: Option<i32>, page: &PageRequest) -> Result<Vec<PostDetail>, Error> {
        let mut qb = post_detail_select(viewer, "p.created_at");
        qb.push(" FROM posts AS p JOIN users AS u ON p.author_id = u.id WHERE 1 = 1");
        if let Some(author_id) = q.author_id {
            qb.push(" AND p.author_id = ");
            qb.push_bind(author_id);
        }
        if let Some(org_id) = q.organization_id {
            qb.push(" AND p.organization_id = ");
            qb.push_bind(org_id);
        }
        if q.personal_only {
            qb.push(" AND p.organization_id IS NULL");
        }
        if q.published_only {
            qb.push(" AND p.published");
        }
        if let Some(follower) = q.followed_by {
            qb.push(" AND p.author_id IN (SELECT followee_id FROM follows WHERE follower_id = ");
            qb.push_bind(follower);
            qb.push(")");
        }
        push_page(&mut qb, "p.created_at", "p.id", Order::NewestFirst, page);
        let list = qb.build_query_as().fetch_all(&mut self.executor).await?;
        Ok(list)
    }

    async fn bookmarked(&mut self, uid: i32, page: &PageRequest) -> Result<Vec<PostDetail>, Error> {
        let mut qb = post_detail_select(Some(uid), "bm.created_at");
        qb.push(
            " FROM bookmarks AS bm
            JOIN posts AS p ON bm.post_id = p.id
            JOIN users AS u ON p.author_id = u.id
            WHERE bm.user_id = ",
        );
        qb.push_bind(uid);
        qb.push(" AND (p.published OR p.author_id = ");
        qb.push_bind(uid);
        qb.push(") AND (p.organization_id IS NULL OR EXISTS(SELECT 1 FROM organization_memberships AS m WHERE m.organization_id = p.organization_id AND m.user_id = ");
        qb.push_bind(uid);
        qb.push("))");
        push_page(&mut qb, "bm.created_at", "p.id", Order::NewestFirst, page);
        let list = qb.build_query_as().fetch_all(&mut self.executor).await?;
        Ok(list)
    }

    async fn update(&mut self, id: i32, data: PostUpdate) -> Result<(), Error> {
        query("UPDATE posts SET content = COALESCE($1, content), published = COALESCE($2, published), updated_at = NOW() WHERE id = $3")
            .bind(data.content)
            .bind(data.published)
            .bind(id)
            .execute(&mut self.executor)
            .await?;
        Ok(())
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        query("DELETE FROM posts WHERE id = $1").bind(id).execute(&mut self.executor).await?;
        Ok(())
    }

    async fn record_view(&mut self, view: View) -> Result<bool, Error> {
        let res = query("INSERT INTO post_views (post_id, viewer_id, ip) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING")
            .bind(view.post_id)
            .bind(view.viewer_id)
            .bind(view.ip)
            .execute(&mut self.executor)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

impl<E> CommentCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, comment: CommentInsert) -> Result<i32, Error> {
        let id = query_scalar("INSERT INTO comments (post_id, author_id, content) VALUES ($1, $2, $3) RETURNING id")
            .bind(comment.post_id)
            .bind(comment.author_id)
            .bind(comment.content)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(id)
    }

    async fn get(&mut self, id: i32) -> Result<Option<Comment>, Error> {
        let comment = query_as(
            "
        SELECT c.id, c.post_id, c.author_id, u.name AS author_name, u.image AS author_image, c.content, c.created_at
        FROM comments AS c
        JOIN users AS u ON c.author_id = u.id
        WHERE c.id = $1",
        )
        .bind(id)
        .fetch_optional(&mut self.executor)
        .await?;
        Ok(comment)
    }

    async fn query(&mut self, post_id: i32, page: &PageRequest) -> Result<Vec<Comment>, Error> {
        let mut qb = QueryBuilder::new(
            "
        SELECT c.id, c.post_id, c.author_id, u.name AS author_name, u.image AS author_image, c.content, c.created_at
        FROM comments AS c
        JOIN users AS u ON c.author_id = u.id
        WHERE c.post_id = ",
        );
        qb.push_bind(post_id);
        push_page(&mut qb, "c.created_at", "c.id", Order::OldestFirst, page);
        let list = qb.build_query_as().fetch_all(&mut self.executor).await?;
        Ok(list)
    }

    async fn delete(&mut self, id: i32) -> Result<(), Error> {
        query("DELETE FROM comments WHERE id = $1").bind(id).execute(&mut self.executor).await?;
        Ok(())
    }
}

impl<E> ReactionCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert_like(&mut self, post_id: i32, uid: i32) -> Result<bool, Error> {
        let res = query("INSERT INTO likes (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(post_id)
            .bind(uid)
            .execute(&mut self.executor)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_like(&mut self, post_id: i32, uid: i32) -> Result<bool, Error> {
        let res = query("DELETE FROM likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(uid)
            .execute(&mut self.executor)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn like_count(&mut self, post_id: i32) -> Result<i64, Error> {
        let count = query_scalar("SELECT COUNT(*) FROM likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(count)
    }

    async fn insert_bookmark(&mut self, post_id: i32, uid: i32) -> Result<bool, Error> {
        let res = query("INSERT INTO bookmarks (post_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(post_id)
            .bind(uid)
            .execute(&mut self.executor)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_bookmark(&mut self, post_id: i32, uid: i32) -> Result<bool, Error> {
        let res = query("DELETE FROM bookmarks WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(uid)
            .execute(&mut self.executor)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn insert_follow(&mut self, follower_id: i32, followee_id: i32) -> Result<bool, Error> {
        let res = query("INSERT INTO follows (follower_id, followee_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(follower_id)
            .bind(followee_id)
            .execute(&mut self.executor)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_follow(&mut self, follower_id: i32, followee_id: i32) -> Result<bool, Error> {
        let res = query("DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2")
            .bind(follower_id)
            .bind(followee_id)
            .execute(&mut self.executor)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn follower_count(&mut self, uid: i32) -> Result<i64, Error> {
        let count = query_scalar("SELECT COUNT(*) FROM follows WHERE followee_id = $1")
            .bind(uid)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(count)
    }

    async fn is_following(&mut self, follower_id: i32, followee_id: i32) -> Result<bool, Error> {
        let exists = query_scalar("SELECT EXISTS(SELECT * FROM follows WHERE follower_id = $1 AND followee_id = $2)")
            .bind(follower_id)
            .bind(followee_id)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(exists)
    }
}

impl<E> NotificationCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, n: NotificationInsert) -> Result<i32, Error> {
        let id = query_scalar(
            "INSERT INTO notifications (recipient_id, actor_id, kind, post_id, organization_id) VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(n.recipient_id)
        .bind(n.actor_id)
        .bind(n.kind)
        .bind(n.post_id)
        .bind(n.organization_id)
        .fetch_one(&mut self.executor)
        .await?;
        Ok(id)
    }

    async fn query(&mut self, q: &NotificationQuery, page: &PageRequest) -> Result<Vec<Notification>, Error> {
        let mut qb = QueryBuilder::new(
            "
        SELECT n.id, n.recipient_id, n.actor_id, u.name AS actor_name, n.kind, n.post_id, n.organization_id, n.read, n.created_at
        FROM notifications AS n
        JOIN users AS u ON n.actor_id = u.id
        WHERE n.recipient_id = ",
        );
        qb.push_bind(q.recipient_id);
        if q.unread_only {
            qb.push(" AND NOT n.read");
        }
        push_page(&mut qb, "n.created_at", "n.id", Order::NewestFirst, page);
        let list = qb.build_query_as().fetch_all(&mut self.executor).await?;
        Ok(list)
    }

    async fn unread_count(&mut self, recipient_id: i32) -> Result<i64, Error> {
        let count = query_scalar("SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND NOT read")
            .bind(recipient_id)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(count)
    }

    async fn has_unread(&mut self, n: &NotificationInsert) -> Result<bool, Error> {
        let exists = query_scalar(
            "SELECT EXISTS(SELECT 1 FROM notifications WHERE recipient_id = $1 AND actor_id = $2 AND kind = $3 AND post_id IS NOT DISTINCT FROM $4 AND NOT read)",
        )
        .bind(n.recipient_id)
        .bind(n.actor_id)
        .bind(n.kind)
        .bind(n.post_id)
        .fetch_one(&mut self.executor)
        .await?;
        Ok(exists)
    }

    async fn mark_read(&mut self, recipient_id: i32, ids: Option<Vec<i32>>) -> Result<u64, Error> {
        let res = query("UPDATE notifications SET read = TRUE WHERE recipient_id = $1 AND NOT read AND ($2::INT[] IS NULL OR id = ANY($2))")
            .bind(recipient_id)
            .bind(ids)
            .execute(&mut self.executor)
            .await?;
        Ok(res.rows_affected())
    }

    async fn delete(&mut self, recipient_id: i32, id: i32) -> Result<bool, Error> {
        let res = query("DELETE FROM notifications WHERE recipient_id = $1 AND id = $2")
            .bind(recipient_id)
            .bind(id)
            .execute(&mut self.executor)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}

impl<E> UploadCommon for PgSqlx<E>
where
    for<'e> &'e mut E: Executor<'e, Database = Postgres>,
{
    async fn insert(&mut self, file: UploadInsert) -> Result<i32, Error> {
        let id = query_scalar("INSERT INTO uploaded_files (owner_id, name, extension, size) VALUES ($1, $2, $3, $4) RETURNING id")
            .bind(file.owner_id)
            .bind(file.name)
            .bind(file.extension)
            .bind(file.size)
            .fetch_one(&mut self.executor)
            .await?;
        Ok(id)
    }

    async fn get_by_name(&mut self, name: &str) -> Result<Option<UploadedFile>, Error> {
        let file = query_as("SELECT * FROM uploaded_files WHERE name = $1")
            .bind(name)
            .fetch_optional(&mut self.executor)
            .await?;
        Ok(file)
    }
}

impl<E> Common for PgSqlx<E> where for<'e> &'e mut E: Executor<'e, Database = Postgres> {}

impl<E> Store for PgSqlx<E> where for<'e> &'e mut E: Executor<'e, Database = Postgres> {}

impl TxStore for PgSqlx<Transaction<'static, Postgres>> {
    async fn commit(self) -> Result<(), Error> {
        self.executor.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), Error> {
        self.executor.rollback().await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PgSqlxManager {
    pool: PgPool,
}

impl PgSqlxManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl Manager for PgSqlxManager {
    type Store = PgSqlx<PoolConnection<Postgres>>;
    type TxStore = PgSqlx<Transaction<'static, Postgres>>;

    async fn db(&self) -> Result<Self::Store, Error> {
        Ok(PgSqlx::new(self.pool.acquire().await?))
    }

    async fn tx(&self) -> Result<Self::TxStore, Error> {
        Ok(PgSqlx::new(self.pool.begin().await?))
    }
}
