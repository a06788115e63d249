pub mod models;
pub mod pagination;
pub mod ports;
pub mod services;
