pub mod mailer;
pub mod payment;
pub mod repository;
pub mod tokener;
pub mod uploader;
