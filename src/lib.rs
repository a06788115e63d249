#![allow(async_fn_in_trait)]

pub mod cache;
pub mod client;
pub mod config;
pub mod context;
pub mod core;
pub mod error;
pub mod handlers;
pub mod impls;
pub mod middlewares;
pub mod request;
pub mod response;
