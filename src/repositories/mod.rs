//! Persistence boundary for carts.
//!
//! Stores are trusted for byte-exact persistence only. Ownership scoping
//! and the merge rule live in [`crate::services::cart_service`].

use async_trait::async_trait;

use crate::errors::ServiceError;
use crate::models::{Cart, CartItem, NewCart, NewCartItem};

pub mod cart_repository;
pub mod memory;

pub use cart_repository::CartRepository;
pub use memory::InMemoryCartStore;

/// Record keeper for carts and their items.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CartStore: Send + Sync {
    /// Persists a new cart, assigning id and timestamps.
    async fn create(&self, cart: NewCart) -> Result<Cart, ServiceError>;

    /// Loads a cart with its items, matching both id and owner in one lookup.
    /// Returns [`ServiceError::CartNotFound`] when no row matches the pair.
    async fn get(&self, cart_id: i64, owner_id: i64) -> Result<Cart, ServiceError>;

    /// Removes every item of the cart; a no-op when there are none.
    async fn delete_all_items(&self, cart_id: i64) -> Result<(), ServiceError>;

    /// Persists a new item. Returns [`ServiceError::ItemAlreadyExists`] when
    /// the cart already holds the product.
    async fn create_item(&self, item: NewCartItem) -> Result<CartItem, ServiceError>;

    /// Writes the item's quantity back and refreshes `updated_at`.
    async fn update_item(&self, item: CartItem) -> Result<CartItem, ServiceError>;

    async fn delete_item(&self, cart_id: i64, product_id: i64) -> Result<(), ServiceError>;
}
