use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::{
    errors::ServiceError,
    models::{Cart, CartItem, NewCart, NewCartItem},
    repositories::CartStore,
};

/// Cart operations offered to the request handlers.
///
/// Every call receives an already-authenticated, non-zero `owner_id`.
#[async_trait]
pub trait ShoppingCartService: Send + Sync {
    async fn create_cart(&self, owner_id: i64) -> Result<Cart, ServiceError>;

    async fn get_cart(&self, cart_id: i64, owner_id: i64) -> Result<Cart, ServiceError>;

    async fn empty_cart(&self, cart_id: i64, owner_id: i64) -> Result<(), ServiceError>;

    async fn add_product(
        &self,
        item: NewCartItem,
        owner_id: i64,
    ) -> Result<CartItem, ServiceError>;

    async fn remove_product(
        &self,
        cart_id: i64,
        product_id: i64,
        owner_id: i64,
    ) -> Result<(), ServiceError>;
}

/// Shopping cart service enforcing ownership scoping and the merge rule.
///
/// The service performs no in-process locking. Each operation is a short
/// sequence of store calls against one cart, and every mutating operation
/// starts by resolving the cart under the caller's owner id again rather
/// than trusting an earlier lookup.
///
/// # Examples
///
/// ```ignore
/// let service = CartService::new(Arc::new(InMemoryCartStore::new()));
/// let cart = service.create_cart(owner_id).await?;
/// service.add_product(NewCartItem::new(cart.id, 5, 1), owner_id).await?;
/// ```
#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn CartStore>,
}

impl CartService {
    pub fn new(store: Arc<dyn CartStore>) -> Self {
        Self { store }
    }

    /// Folds `quantity` into the stored line and writes it back.
    async fn merge_into(&self, mut existing: CartItem, quantity: u64) -> Result<CartItem, ServiceError> {
        existing.absorb(quantity)?;
        self.store.update_item(existing).await
    }
}

#[async_trait]
impl ShoppingCartService for CartService {
    #[instrument(skip(self))]
    async fn create_cart(&self, owner_id: i64) -> Result<Cart, ServiceError> {
        let new_cart = NewCart::new(owner_id);
        new_cart.validate()?;

        let cart = self.store.create(new_cart).await?;
        info!(cart_id = cart.id, owner_id, "Created cart");
        Ok(cart)
    }

    #[instrument(skip(self))]
    async fn get_cart(&self, cart_id: i64, owner_id: i64) -> Result<Cart, ServiceError> {
        self.store.get(cart_id, owner_id).await
    }

    #[instrument(skip(self))]
    async fn empty_cart(&self, cart_id: i64, owner_id: i64) -> Result<(), ServiceError> {
        let cart = self.get_cart(cart_id, owner_id).await?;
        if cart.is_empty() {
            return Ok(());
        }

        self.store.delete_all_items(cart.id).await?;
        info!(cart_id, removed = cart.items.len(), "Emptied cart");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn add_product(
        &self,
        item: NewCartItem,
        owner_id: i64,
    ) -> Result<CartItem, ServiceError> {
        item.validate()?;

        let cart = self.get_cart(item.cart_id, owner_id).await?;
        if let Some(existing) = cart.product(item.product_id) {
            let merged = match self.merge_into(existing.clone(), item.quantity).await {
                Err(ServiceError::ItemNotFound) => {
                    // Line removed since the lookup: insert the incoming quantity.
                    warn!(
                        cart_id = item.cart_id,
                        product_id = item.product_id,
                        "Cart line vanished before merge, inserting"
                    );
                    self.store.create_item(item).await?
                }
                other => other?,
            };
            info!(
                cart_id = item.cart_id,
                product_id = item.product_id,
                quantity = merged.quantity,
                "Merged product into cart"
            );
            return Ok(merged);
        }

        match self.store.create_item(item).await {
            Ok(created) => {
                info!(
                    cart_id = item.cart_id,
                    product_id = item.product_id,
                    quantity = created.quantity,
                    "Added product to cart"
                );
                Ok(created)
            }
            Err(ServiceError::ItemAlreadyExists) => {
                // Lost the first-insert race: merge into the row that won.
                warn!(
                    cart_id = item.cart_id,
                    product_id = item.product_id,
                    "Concurrent insert detected, merging"
                );
                let cart = self.get_cart(item.cart_id, owner_id).await?;
                let existing = cart
                    .product(item.product_id)
                    .cloned()
                    .ok_or(ServiceError::ItemAlreadyExists)?;
                self.merge_into(existing, item.quantity).await
            }
            Err(err) => Err(err),
        }
    }

    #[instrument(skip(self))]
    async fn remove_product(
        &self,
        cart_id: i64,
        product_id: i64,
        owner_id: i64,
    ) -> Result<(), ServiceError> {
        let cart = self.get_cart(cart_id, owner_id).await?;
        if !cart.has_product(product_id) {
            return Err(ServiceError::ItemNotFound);
        }

        self.store.delete_item(cart.id, product_id).await?;
        info!(cart_id, product_id, "Removed product from cart");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::MockCartStore;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use mockall::{predicate::eq, Sequence};

    fn item(id: i64, cart_id: i64, product_id: i64, quantity: u64) -> CartItem {
        let now = Utc::now();
        CartItem {
            id,
            cart_id,
            product_id,
            quantity,
            created_at: now,
            updated_at: now,
        }
    }

    fn cart(id: i64, owner_id: i64, items: Vec<CartItem>) -> Cart {
        let now = Utc::now();
        Cart {
            id,
            owner_id,
            created_at: now,
            updated_at: now,
            items,
        }
    }

    fn service(store: MockCartStore) -> CartService {
        CartService::new(Arc::new(store))
    }

    #[tokio::test]
    async fn create_cart_rejects_missing_owner_without_touching_store() {
        let mut store = MockCartStore::new();
        store.expect_create().never();

        let result = service(store).create_cart(0).await;
        assert_matches!(result, Err(ServiceError::OwnerNotSet));
    }

    #[tokio::test]
    async fn create_cart_returns_store_assigned_cart() {
        let mut store = MockCartStore::new();
        store
            .expect_create()
            .with(eq(NewCart::new(1)))
            .times(1)
            .returning(|new_cart| Ok(cart(42, new_cart.owner_id, vec![])));

        let created = service(store).create_cart(1).await.unwrap();
        assert_eq!(created.id, 42);
        assert!(created.items.is_empty());
    }

    #[tokio::test]
    async fn empty_cart_on_empty_cart_is_a_noop() {
        let mut store = MockCartStore::new();
        store
            .expect_get()
            .with(eq(1), eq(1))
            .returning(|id, owner| Ok(cart(id, owner, vec![])));
        store.expect_delete_all_items().never();

        service(store).empty_cart(1, 1).await.unwrap();
    }

    #[tokio::test]
    async fn empty_cart_deletes_items_after_ownership_check() {
        let mut store = MockCartStore::new();
        store
            .expect_get()
            .with(eq(1), eq(1))
            .returning(|id, owner| Ok(cart(id, owner, vec![item(1, id, 1, 1), item(2, id, 2, 10)])));
        store
            .expect_delete_all_items()
            .with(eq(1))
            .times(1)
            .returning(|_| Ok(()));

        service(store).empty_cart(1, 1).await.unwrap();
    }

    #[tokio::test]
    async fn empty_cart_of_foreign_cart_is_not_found() {
        let mut store = MockCartStore::new();
        store
            .expect_get()
            .with(eq(1), eq(2))
            .returning(|_, _| Err(ServiceError::CartNotFound));
        store.expect_delete_all_items().never();

        assert_matches!(
            service(store).empty_cart(1, 2).await,
            Err(ServiceError::CartNotFound)
        );
    }

    #[tokio::test]
    async fn add_product_validates_before_lookup() {
        let mut store = MockCartStore::new();
        store.expect_get().never();

        let service = service(store);
        assert_matches!(
            service.add_product(NewCartItem::new(1, 0, 5), 1).await,
            Err(ServiceError::ProductMissing)
        );
        assert_matches!(
            service.add_product(NewCartItem::new(1, 5, 0), 1).await,
            Err(ServiceError::QuantityMissing)
        );
    }

    #[tokio::test]
    async fn add_product_merges_stored_quantity_with_incoming() {
        let mut store = MockCartStore::new();
        store
            .expect_get()
            .returning(|id, owner| Ok(cart(id, owner, vec![item(9, id, 5, 1)])));
        store.expect_create_item().never();
        store
            .expect_update_item()
            .withf(|merged| merged.id == 9 && merged.product_id == 5 && merged.quantity == 3)
            .times(1)
            .returning(Ok);

        let merged = service(store)
            .add_product(NewCartItem::new(1, 5, 2), 1)
            .await
            .unwrap();
        assert_eq!(merged.id, 9);
        assert_eq!(merged.quantity, 3);
    }

    #[tokio::test]
    async fn add_product_creates_new_line() {
        let mut store = MockCartStore::new();
        store
            .expect_get()
            .returning(|id, owner| Ok(cart(id, owner, vec![item(9, id, 5, 1)])));
        store.expect_update_item().never();
        store
            .expect_create_item()
            .with(eq(NewCartItem::new(1, 6, 2)))
            .times(1)
            .returning(|new| Ok(item(10, new.cart_id, new.product_id, new.quantity)));

        let created = service(store)
            .add_product(NewCartItem::new(1, 6, 2), 1)
            .await
            .unwrap();
        assert_eq!(created.id, 10);
        assert_eq!(created.quantity, 2);
    }

    #[tokio::test]
    async fn add_product_to_foreign_cart_is_not_found() {
        let mut store = MockCartStore::new();
        store
            .expect_get()
            .with(eq(1), eq(2))
            .returning(|_, _| Err(ServiceError::CartNotFound));
        store.expect_create_item().never();
        store.expect_update_item().never();

        assert_matches!(
            service(store).add_product(NewCartItem::new(1, 5, 1), 2).await,
            Err(ServiceError::CartNotFound)
        );
    }

    #[tokio::test]
    async fn add_product_merges_after_losing_insert_race() {
        let mut store = MockCartStore::new();
        let mut seq = Sequence::new();
        store
            .expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|id, owner| Ok(cart(id, owner, vec![])));
        store
            .expect_create_item()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(ServiceError::ItemAlreadyExists));
        store
            .expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|id, owner| Ok(cart(id, owner, vec![item(9, id, 5, 2)])));
        store
            .expect_update_item()
            .withf(|merged| merged.id == 9 && merged.quantity == 5)
            .times(1)
            .in_sequence(&mut seq)
            .returning(Ok);

        let merged = service(store)
            .add_product(NewCartItem::new(1, 5, 3), 1)
            .await
            .unwrap();
        assert_eq!(merged.quantity, 5);
    }

    #[tokio::test]
    async fn add_product_inserts_when_line_vanishes_before_merge() {
        let mut store = MockCartStore::new();
        let mut seq = Sequence::new();
        store
            .expect_get()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|id, owner| Ok(cart(id, owner, vec![item(9, id, 5, 1)])));
        store
            .expect_update_item()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(ServiceError::ItemNotFound));
        store
            .expect_create_item()
            .with(eq(NewCartItem::new(1, 5, 2)))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|new| Ok(item(11, new.cart_id, new.product_id, new.quantity)));

        let created = service(store)
            .add_product(NewCartItem::new(1, 5, 2), 1)
            .await
            .unwrap();
        assert_eq!(created.id, 11);
        assert_eq!(created.quantity, 2);
    }

    #[tokio::test]
    async fn add_product_surfaces_overflow_without_writing() {
        let mut store = MockCartStore::new();
        store
            .expect_get()
            .returning(|id, owner| Ok(cart(id, owner, vec![item(9, id, 5, u64::MAX)])));
        store.expect_update_item().never();

        assert_matches!(
            service(store).add_product(NewCartItem::new(1, 5, 1), 1).await,
            Err(ServiceError::QuantityOverflow { .. })
        );
    }

    #[tokio::test]
    async fn remove_absent_product_is_item_not_found_and_never_deletes() {
        let mut store = MockCartStore::new();
        store
            .expect_get()
            .returning(|id, owner| Ok(cart(id, owner, vec![item(9, id, 5, 1)])));
        store.expect_delete_item().never();

        assert_matches!(
            service(store).remove_product(1, 6, 1).await,
            Err(ServiceError::ItemNotFound)
        );
    }

    #[tokio::test]
    async fn remove_present_product_deletes_it() {
        let mut store = MockCartStore::new();
        store
            .expect_get()
            .returning(|id, owner| Ok(cart(id, owner, vec![item(9, id, 5, 1)])));
        store
            .expect_delete_item()
            .with(eq(1), eq(5))
            .times(1)
            .returning(|_, _| Ok(()));

        service(store).remove_product(1, 5, 1).await.unwrap();
    }

    #[tokio::test]
    async fn storage_errors_propagate_unchanged() {
        let mut store = MockCartStore::new();
        store.expect_get().returning(|_, _| {
            Err(ServiceError::DatabaseError(sea_orm::DbErr::Custom(
                "connection reset".into(),
            )))
        });

        assert_matches!(
            service(store).get_cart(1, 1).await,
            Err(ServiceError::DatabaseError(_))
        );
    }
}
