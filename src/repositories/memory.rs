use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::errors::ServiceError;
use crate::models::{Cart, CartItem, NewCart, NewCartItem};

use super::CartStore;

#[derive(Debug, Default)]
struct Tables {
    next_cart_id: i64,
    next_item_id: i64,
    carts: HashMap<i64, Cart>,
    // (cart id, product id) -> item; the key is the uniqueness constraint
    items: BTreeMap<(i64, i64), CartItem>,
}

/// Process-local cart store.
///
/// Each call holds the table lock for its whole duration, so every single
/// read or write is atomic, the same guarantee the SQL store gives.
#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    tables: RwLock<Tables>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn create(&self, cart: NewCart) -> Result<Cart, ServiceError> {
        let mut tables = self.tables.write().await;
        tables.next_cart_id += 1;
        let now = Utc::now();
        let cart = Cart {
            id: tables.next_cart_id,
            owner_id: cart.owner_id,
            created_at: now,
            updated_at: now,
            items: Vec::new(),
        };
        tables.carts.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn get(&self, cart_id: i64, owner_id: i64) -> Result<Cart, ServiceError> {
        let tables = self.tables.read().await;
        let mut cart = tables
            .carts
            .get(&cart_id)
            .filter(|cart| cart.owner_id == owner_id)
            .cloned()
            .ok_or(ServiceError::CartNotFound)?;

        cart.items = tables
            .items
            .range((cart_id, i64::MIN)..=(cart_id, i64::MAX))
            .map(|(_, item)| item.clone())
            .collect();
        Ok(cart)
    }

    async fn delete_all_items(&self, cart_id: i64) -> Result<(), ServiceError> {
        let mut tables = self.tables.write().await;
        tables.items.retain(|(owner_cart, _), _| *owner_cart != cart_id);
        Ok(())
    }

    async fn create_item(&self, item: NewCartItem) -> Result<CartItem, ServiceError> {
        let mut tables = self.tables.write().await;
        let key = (item.cart_id, item.product_id);
        if tables.items.contains_key(&key) {
            return Err(ServiceError::ItemAlreadyExists);
        }

        tables.next_item_id += 1;
        let now = Utc::now();
        let stored = CartItem {
            id: tables.next_item_id,
            cart_id: item.cart_id,
            product_id: item.product_id,
            quantity: item.quantity,
            created_at: now,
            updated_at: now,
        };
        tables.items.insert(key, stored.clone());
        Ok(stored)
    }

    async fn update_item(&self, item: CartItem) -> Result<CartItem, ServiceError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .items
            .values_mut()
            .find(|stored| stored.id == item.id)
            .ok_or(ServiceError::ItemNotFound)?;

        stored.quantity = item.quantity;
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_item(&self, cart_id: i64, product_id: i64) -> Result<(), ServiceError> {
        self.tables.write().await.items.remove(&(cart_id, product_id));
        Ok(())
    }
}
