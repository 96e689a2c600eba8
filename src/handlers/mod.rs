pub mod carts;
pub mod common;
pub mod health;
