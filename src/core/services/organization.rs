use log::info;

use crate::core::models::organization::{Insert, Member, Membership, Organization, Role, Update};
use crate::core::models::post::{PostDetail, Query as PostQuery};
use crate::core::pagination::{Page, PageRequest};
use crate::core::ports::repository::{MembershipCommon, OrganizationCommon, PostCommon, Store, TxStore};
use crate::error::Error;

pub fn validate_slug(slug: &str) -> Result<(), Error> {
    let valid_len = (3..=48).contains(&slug.len());
    if !valid_len || !slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        return Err(Error::bad_request("slug must be 3 to 48 lowercase letters, digits or dashes"));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<String, Error> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 100 {
        return Err(Error::bad_request("organization name must be 1 to 100 characters"));
    }
    Ok(name.to_owned())
}

/// Loads the organization and checks that `uid` holds at least `min`.
pub async fn authorize<S: Store>(store: &mut S, org_id: i32, uid: i32, min: Role) -> Result<(Organization, Role), Error> {
    let org = OrganizationCommon::get(store, org_id).await?.ok_or_else(|| Error::not_found("organization"))?;
    let role = MembershipCommon::role_of(store, org_id, uid)
        .await?
        .ok_or_else(|| Error::forbidden("not a member of this organization"))?;
    if role < min {
        return Err(Error::forbidden(format!("requires {} role", min)));
    }
    Ok((org, role))
}

/// Creates the organization with the creator as its owner.
pub async fn create<T: TxStore>(mut tx: T, uid: i32, data: Insert) -> Result<Organization, Error> {
    let name = validate_name(&data.name)?;
    validate_slug(&data.slug)?;
    if OrganizationCommon::slug_exists(&mut tx, &data.slug).await? {
        return Err(Error::bad_request("slug already taken"));
    }
    let id = OrganizationCommon::insert(&mut tx, Insert { name, slug: data.slug }).await?;
    MembershipCommon::add_member(&mut tx, id, uid, Role::Owner).await?;
    let org = OrganizationCommon::get(&mut tx, id).await?.ok_or_else(|| Error::not_found("organization"))?;
    tx.commit().await?;
    info!("organization {} ({}) created by user {}", org.id, org.slug, uid);
    Ok(org)
}

pub async fn list<S: Store>(store: &mut S, uid: i32, page: &PageRequest) -> Result<Page<Membership>, Error> {
    let rows = OrganizationCommon::query_by_member(store, uid, page).await?;
    Ok(Page::from_rows(rows, page))
}

pub async fn detail<S: Store>(store: &mut S, org_id: i32, uid: i32) -> Result<Organization, Error> {
    let (org, _) = authorize(store, org_id, uid, Role::Member).await?;
    Ok(org)
}

pub async fn update<S: Store>(store: &mut S, org_id: i32, uid: i32, data: Update) -> Result<Organization, Error> {
    authorize(store, org_id, uid, Role::Admin).await?;
    let name = validate_name(&data.name)?;
    OrganizationCommon::update(store, org_id, Update { name }).await?;
    OrganizationCommon::get(store, org_id).await?.ok_or_else(|| Error::not_found("organization"))
}

pub async fn delete<S: Store>(store: &mut S, org_id: i32, uid: i32) -> Result<(), Error> {
    authorize(store, org_id, uid, Role::Owner).await?;
    OrganizationCommon::delete(store, org_id).await?;
    info!("organization {} deleted by user {}", org_id, uid);
    Ok(())
}

pub async fn members<S: Store>(store: &mut S, org_id: i32, uid: i32, page: &PageRequest) -> Result<Page<Member>, Error> {
    authorize(store, org_id, uid, Role::Member).await?;
    let rows = MembershipCommon::members(store, org_id, page).await?;
    Ok(Page::from_rows(rows, page))
}

/// Changes a member's role. Only owners grant or revoke ownership, and the
/// last owner keeps it.
pub async fn set_role<S: Store>(store: &mut S, org_id: i32, actor: i32, target: i32, role: Role) -> Result<(), Error> {
    let (_, actor_role) = authorize(store, org_id, actor, Role::Admin).await?;
    let current = MembershipCommon::role_of(store, org_id, target).await?.ok_or_else(|| Error::not_found("member"))?;
    if current == role {
        return Ok(());
    }
    if (role == Role::Owner || current == Role::Owner) && actor_role != Role::Owner {
        return Err(Error::forbidden("only an owner can grant or revoke ownership"));
    }
    if current == Role::Owner && MembershipCommon::count_owners(store, org_id).await? <= 1 {
        return Err(Error::bad_request("the last owner cannot be demoted"));
    }
    MembershipCommon::set_role(store, org_id, target, role).await
}

/// Removes a member. Members may remove themselves; admins remove others,
/// but only an owner removes another owner.
pub async fn remove_member<S: Store>(store: &mut S, org_id: i32, actor: i32, target: i32) -> Result<(), Error> {
    let min = if actor == target { Role::Member } else { Role::Admin };
    let (_, actor_role) = authorize(store, org_id, actor, min).await?;
    let current = MembershipCommon::role_of(store, org_id, target).await?.ok_or_else(|| Error::not_found("member"))?;
    if current == Role::Owner {
        if actor != target && actor_role != Role::Owner {
            return Err(Error::forbidden("only an owner can remove an owner"));
        }
        if MembershipCommon::count_owners(store, org_id).await? <= 1 {
            return Err(Error::bad_request("the last owner cannot leave the organization"));
        }
    }
    MembershipCommon::remove_member(store, org_id, target).await?;
    Ok(())
}

pub async fn posts<S: Store>(store: &mut S, org_id: i32, uid: i32, page: &PageRequest) -> Result<Page<PostDetail>, Error> {
    authorize(store, org_id, uid, Role::Member).await?;
    let query = PostQuery {
        organization_id: Some(org_id),
        published_only: true,
        ..default::default()
    };
    let rows = PostCommon::query(store, &query, Some(uid), page).await?;
    Ok(Page::from_rows(rows, page))
}
