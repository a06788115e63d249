pub mod memory;
pub mod sqlx;
