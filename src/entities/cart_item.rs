use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

use crate::{errors::ServiceError, models};

/// Cart line item row; `(shoppingcart_id, product_id)` is unique
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "shoppingcart_item")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_name = "shoppingcart_id")]
    pub cart_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cart::Entity",
        from = "Column::CartId",
        to = "super::cart::Column::Id"
    )]
    Cart,
}

impl Related<super::cart::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cart.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for models::CartItem {
    type Error = ServiceError;

    fn try_from(row: Model) -> Result<Self, Self::Error> {
        let quantity = u64::try_from(row.quantity).map_err(|_| {
            ServiceError::Internal(format!(
                "cart item {} has negative quantity {}",
                row.id, row.quantity
            ))
        })?;

        Ok(Self {
            id: row.id,
            cart_id: row.cart_id,
            product_id: row.product_id,
            quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Converts a domain quantity into the signed column type.
pub fn quantity_column(quantity: u64) -> Result<i64, ServiceError> {
    i64::try_from(quantity).map_err(|_| {
        ServiceError::InvalidInput(format!("quantity {} exceeds storage limit", quantity))
    })
}
