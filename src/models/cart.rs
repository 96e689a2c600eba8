use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::ServiceError;

/// A per-owner collection of line items.
///
/// `items` is unique by `product_id`; the stores enforce this and the
/// service never pushes a second entry for a product already present.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Cart {
    pub id: i64,
    /// Principal the cart is scoped to
    #[serde(rename = "user_id")]
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn has_product(&self, product_id: i64) -> bool {
        self.items.iter().any(|item| item.product_id == product_id)
    }

    pub fn product(&self, product_id: i64) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Payload for creating a cart; the store assigns id and timestamps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NewCart {
    pub owner_id: i64,
}

impl NewCart {
    pub fn new(owner_id: i64) -> Self {
        Self { owner_id }
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.owner_id == 0 {
            return Err(ServiceError::OwnerNotSet);
        }
        Ok(())
    }
}

/// One product line within a cart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub id: i64,
    #[serde(rename = "shoppingcart_id")]
    pub cart_id: i64,
    pub product_id: i64,
    pub quantity: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    /// Adds `quantity` to the stored quantity. Identity and timestamps are
    /// left untouched; the store refreshes `updated_at` on write.
    pub fn absorb(&mut self, quantity: u64) -> Result<(), ServiceError> {
        self.quantity = self
            .quantity
            .checked_add(quantity)
            .ok_or(ServiceError::QuantityOverflow {
                current: self.quantity,
                added: quantity,
            })?;
        Ok(())
    }
}

/// Payload for adding a product to a cart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NewCartItem {
    pub cart_id: i64,
    pub product_id: i64,
    pub quantity: u64,
}

impl NewCartItem {
    pub fn new(cart_id: i64, product_id: i64, quantity: u64) -> Self {
        Self {
            cart_id,
            product_id,
            quantity,
        }
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.product_id == 0 {
            return Err(ServiceError::ProductMissing);
        }
        if self.quantity == 0 {
            return Err(ServiceError::QuantityMissing);
        }
        Ok(())
    }
}
