//! Cart domain model and its invariants.

pub mod cart;

pub use cart::{Cart, CartItem, NewCart, NewCartItem};
