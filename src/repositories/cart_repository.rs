use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set, SqlErr,
};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::entities::cart_item::quantity_column;
use crate::entities::{cart, cart_item, Cart as CartEntity, CartItem as CartItemEntity};
use crate::errors::ServiceError;
use crate::models::{Cart, CartItem, NewCart, NewCartItem};

use super::CartStore;

/// SQL-backed cart store
#[derive(Debug, Clone)]
pub struct CartRepository {
    db: Arc<DatabaseConnection>,
}

impl CartRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn map_item_insert_error(err: DbErr) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::ItemAlreadyExists,
        _ => ServiceError::DatabaseError(err),
    }
}

#[async_trait]
impl CartStore for CartRepository {
    #[instrument(skip(self))]
    async fn create(&self, cart: NewCart) -> Result<Cart, ServiceError> {
        let now = Utc::now();
        let row = cart::ActiveModel {
            id: ActiveValue::NotSet,
            owner_id: Set(cart.owner_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db())
        .await?;

        debug!(cart_id = row.id, "cart row inserted");
        row.into_cart(Vec::new())
    }

    #[instrument(skip(self))]
    async fn get(&self, cart_id: i64, owner_id: i64) -> Result<Cart, ServiceError> {
        let mut rows = CartEntity::find()
            .filter(cart::Column::Id.eq(cart_id))
            .filter(cart::Column::OwnerId.eq(owner_id))
            .find_with_related(CartItemEntity)
            .all(self.db())
            .await?;

        let (row, items) = rows.pop().ok_or(ServiceError::CartNotFound)?;
        row.into_cart(items)
    }

    #[instrument(skip(self))]
    async fn delete_all_items(&self, cart_id: i64) -> Result<(), ServiceError> {
        let result = CartItemEntity::delete_many()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .exec(self.db())
            .await?;

        debug!(cart_id, removed = result.rows_affected, "cart items deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn create_item(&self, item: NewCartItem) -> Result<CartItem, ServiceError> {
        let now = Utc::now();
        let row = cart_item::ActiveModel {
            id: ActiveValue::NotSet,
            cart_id: Set(item.cart_id),
            product_id: Set(item.product_id),
            quantity: Set(quantity_column(item.quantity)?),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db())
        .await
        .map_err(map_item_insert_error)?;

        CartItem::try_from(row)
    }

    #[instrument(skip(self))]
    async fn update_item(&self, item: CartItem) -> Result<CartItem, ServiceError> {
        let row = cart_item::ActiveModel {
            id: ActiveValue::Unchanged(item.id),
            quantity: Set(quantity_column(item.quantity)?),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .update(self.db())
        .await
        .map_err(|err| match err {
            DbErr::RecordNotUpdated | DbErr::RecordNotFound(_) => ServiceError::ItemNotFound,
            other => ServiceError::DatabaseError(other),
        })?;

        CartItem::try_from(row)
    }

    #[instrument(skip(self))]
    async fn delete_item(&self, cart_id: i64, product_id: i64) -> Result<(), ServiceError> {
        CartItemEntity::delete_many()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .exec(self.db())
            .await?;
        Ok(())
    }
}
