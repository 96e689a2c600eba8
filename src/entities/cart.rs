use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

use crate::models;

/// Shopping cart row
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "shoppingcart")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(column_name = "user_id")]
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::cart_item::Entity")]
    CartItems,
}

impl Related<super::cart_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CartItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Joins the row with its item rows into the domain cart.
    pub fn into_cart(
        self,
        items: Vec<super::cart_item::Model>,
    ) -> Result<models::Cart, crate::errors::ServiceError> {
        let items = items
            .into_iter()
            .map(models::CartItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(models::Cart {
            id: self.id,
            owner_id: self.owner_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        })
    }
}
