#[cfg(test)]
pub mod fake;
pub mod stripe;
