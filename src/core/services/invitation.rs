use chrono::{DateTime, Duration, Utc};
use log::info;

use super::auth::{normalize_email, random_string, TOKEN_LEN};
use super::notification::notify;
use super::organization::authorize;
use crate::core::models::invitation::{Create, Insert, Invitation};
use crate::core::models::notification::Kind;
use crate::core::models::organization::{Organization, Role};
use crate::core::ports::mailer::{Mail, Mailer};
use crate::core::ports::repository::{InvitationCommon, MembershipCommon, OrganizationCommon, Store, TxStore, UserCommon};
use crate::error::Error;

pub const INVITATION_TTL_DAYS: i64 = 7;

/// Invites an email address into the organization. Members plus pending
/// invitations may not exceed the plan's limit.
pub async fn create<S, M>(store: &mut S, mailer: &M, public_url: &str, org_id: i32, uid: i32, data: Create, now: DateTime<Utc>) -> Result<Invitation, Error>
where
    S: Store,
    M: Mailer,
{
    let (org, role) = authorize(store, org_id, uid, Role::Admin).await?;
    if data.role == Role::Owner && role != Role::Owner {
        return Err(Error::forbidden("only an owner can invite owners"));
    }
    let email = normalize_email(&data.email)?;
    if let Some(limit) = org.plan.member_limit() {
        let members = MembershipCommon::count_members(store, org_id).await?;
        let pending = InvitationCommon::count_pending(store, org_id, now).await?;
        if members + pending >= limit {
            return Err(Error::forbidden(format!("the {} plan allows at most {} members", org.plan.as_str(), limit)));
        }
    }
    let token = random_string(TOKEN_LEN);
    let id = InvitationCommon::insert(
        store,
        Insert {
            organization_id: org_id,
            email: email.clone(),
            role: data.role,
            token: token.clone(),
            inviter_id: uid,
            expires_at: now + Duration::days(INVITATION_TTL_DAYS),
        },
    )
    .await?;
    mailer
        .send(Mail {
            to: email,
            subject: format!("You are invited to join {}", org.name),
            body: format!("Accept the invitation: {}/invitations/accept?token={}", public_url, token),
        })
        .await?;
    InvitationCommon::list(store, org_id)
        .await?
        .into_iter()
        .find(|i| i.id == id)
        .ok_or_else(|| Error::not_found("invitation"))
}

pub async fn list<S: Store>(store: &mut S, org_id: i32, uid: i32) -> Result<Vec<Invitation>, Error> {
    authorize(store, org_id, uid, Role::Admin).await?;
    InvitationCommon::list(store, org_id).await
}

pub async fn revoke<S: Store>(store: &mut S, org_id: i32, uid: i32, invitation_id: i32) -> Result<(), Error> {
    authorize(store, org_id, uid, Role::Admin).await?;
    if !InvitationCommon::delete(store, org_id, invitation_id).await? {
        return Err(Error::not_found("invitation"));
    }
    Ok(())
}

/// Joins the caller to the invitation's organization and consumes the
/// invitation. Nothing changes when the invitation is rejected.
pub async fn accept<T: TxStore>(mut tx: T, uid: i32, token: &str, now: DateTime<Utc>) -> Result<Organization, Error> {
    let user = UserCommon::get(&mut tx, uid).await?.ok_or_else(|| Error::not_found("user"))?;
    let invitation = InvitationCommon::take_by_token(&mut tx, token).await?.ok_or_else(|| Error::not_found("invitation"))?;
    if invitation.is_expired(now) {
        tx.rollback().await?;
        return Err(Error::bad_request("invitation expired"));
    }
    if !invitation.email.eq_ignore_ascii_case(&user.email) {
        tx.rollback().await?;
        return Err(Error::forbidden("invitation was sent to a different email address"));
    }
    let org_id = invitation.organization_id;
    if MembershipCommon::role_of(&mut tx, org_id, uid).await?.is_some() {
        tx.rollback().await?;
        return Err(Error::bad_request("already a member of this organization"));
    }
    MembershipCommon::add_member(&mut tx, org_id, uid, invitation.role).await?;
    notify(&mut tx, invitation.inviter_id, uid, Kind::Invitation, None, Some(org_id)).await?;
    let org = OrganizationCommon::get(&mut tx, org_id).await?.ok_or_else(|| Error::not_found("organization"))?;
    tx.commit().await?;
    info!("user {} joined organization {} as {}", uid, org_id, invitation.role);
    Ok(org)
}
