use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20240101_000001_create_shoppingcart_tables::Migration)]
    }
}

mod m20240101_000001_create_shoppingcart_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_shoppingcart_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ShoppingCart::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ShoppingCart::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ShoppingCart::UserId).big_integer().not_null())
                        .col(
                            ColumnDef::new(ShoppingCart::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShoppingCart::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shoppingcart_user_id")
                        .table(ShoppingCart::Table)
                        .col(ShoppingCart::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ShoppingCartItem::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ShoppingCartItem::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(ShoppingCartItem::ShoppingcartId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShoppingCartItem::ProductId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShoppingCartItem::Quantity)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShoppingCartItem::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ShoppingCartItem::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_shoppingcart_item_shoppingcart_id")
                                .from(ShoppingCartItem::Table, ShoppingCartItem::ShoppingcartId)
                                .to(ShoppingCart::Table, ShoppingCart::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // One line per product in a cart; concurrent first inserts collide here
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_shoppingcart_item_cart_product")
                        .table(ShoppingCartItem::Table)
                        .col(ShoppingCartItem::ShoppingcartId)
                        .col(ShoppingCartItem::ProductId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ShoppingCartItem::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ShoppingCart::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum ShoppingCart {
        #[iden = "shoppingcart"]
        Table,
        Id,
        UserId,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum ShoppingCartItem {
        #[iden = "shoppingcart_item"]
        Table,
        Id,
        ShoppingcartId,
        ProductId,
        Quantity,
        CreatedAt,
        UpdatedAt,
    }
}
