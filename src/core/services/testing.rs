use crate::core::models::post::Insert as PostInsert;
use crate::core::models::user::Insert as UserInsert;
use crate::core::ports::repository::{Manager, PostCommon, UserCommon};
use crate::impls::repository::memory::{MemManager, MemStore};

pub(crate) async fn db(manager: &MemManager) -> MemStore {
    manager.db().await.unwrap()
}

pub(crate) async fn user(manager: &MemManager, email: &str) -> i32 {
    UserCommon::insert(
        &mut db(manager).await,
        UserInsert {
            name: email.split('@').next().unwrap().to_owned(),
            email: email.to_owned(),
            password: None,
            salt: None,
            email_verified: true,
        },
    )
    .await
    .unwrap()
}

pub(crate) async fn post(manager: &MemManager, author_id: i32, organization_id: Option<i32>, published: bool) -> i32 {
    PostCommon::insert(
        &mut db(manager).await,
        PostInsert {
            author_id,
            organization_id,
            content: format!("post by {}", author_id),
            published,
        },
    )
    .await
    .unwrap()
}
