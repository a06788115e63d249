use crate::core::models::user::{Me, Patch, Profile};
use crate::core::ports::repository::{Store, UserCommon};
use crate::error::Error;

pub const MAX_BIO_LEN: usize = 500;

pub async fn me<S: Store>(store: &mut S, uid: i32) -> Result<Me, Error> {
    let user = UserCommon::get(store, uid).await?.ok_or_else(|| Error::not_found("user"))?;
    Ok(user.into())
}

pub async fn update_me<S: Store>(store: &mut S, uid: i32, mut patch: Patch) -> Result<Me, Error> {
    if let Some(name) = &patch.name {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > 100 {
            return Err(Error::bad_request("name must be 1 to 100 characters"));
        }
        patch.name = Some(name.to_owned());
    }
    if patch.bio.as_ref().map_or(false, |bio| bio.chars().count() > MAX_BIO_LEN) {
        return Err(Error::bad_request(format!("bio must be at most {} characters", MAX_BIO_LEN)));
    }
    me(store, uid).await?;
    UserCommon::patch(store, uid, patch).await?;
    me(store, uid).await
}

pub async fn profile<S: Store>(store: &mut S, uid: i32) -> Result<Profile, Error> {
    UserCommon::profile(store, uid).await?.ok_or_else(|| Error::not_found("user"))
}
