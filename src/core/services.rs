pub mod auth;
pub mod billing;
pub mod comment;
pub mod invitation;
pub mod notification;
pub mod organization;
pub mod post;
pub mod reaction;
pub mod upload;
pub mod user;
pub mod widget;

#[cfg(test)]
pub(crate) mod testing;
