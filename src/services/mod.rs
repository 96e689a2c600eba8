// Cart orchestration on top of the store
pub mod cart_service;

pub use cart_service::{CartService, ShoppingCartService};
