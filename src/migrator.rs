use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_catalog_tables::Migration),
            Box::new(m20250101_000002_create_customer_tables::Migration),
            Box::new(m20250101_000003_create_cart_lines_table::Migration),
            Box::new(m20250101_000004_create_orders_tables::Migration),
            Box::new(m20250101_000005_create_id_sequences_table::Migration),
        ]
    }
}

mod m20250101_000001_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Products::Sku)
                                .string_len(13)
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Products::Title).string_len(255).not_null())
                        .col(
                            ColumnDef::new(Products::RegularPrice)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::Stock)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::Status)
                                .string_len(20)
                                .not_null()
                                .default("unpublished"),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(ProductImages::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductImages::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(ProductImages::ProductSku)
                                .string_len(13)
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductImages::Image).text().not_null())
                        .col(
                            ColumnDef::new(ProductImages::Position)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_product_images_product")
                                .from(ProductImages::Table, ProductImages::ProductSku)
                                .to(Products::Table, Products::Sku)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_product_images_product_sku")
                        .table(ProductImages::Table)
                        .col(ProductImages::ProductSku)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ProductImages::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Products {
        Table,
        Sku,
        Title,
        RegularPrice,
        Stock,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum ProductImages {
        Table,
        Id,
        ProductSku,
        Image,
        Position,
    }
}

mod m20250101_000002_create_customer_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_customer_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Customers::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Customers::CustomerId)
                                .string_len(13)
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Customers::FirstName)
                                .string_len(100)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Customers::LastName)
                                .string_len(100)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Customers::Email)
                                .string_len(255)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Customers::Phone).string_len(20).null())
                        .col(
                            ColumnDef::new(Customers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Customers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CustomerAddresses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CustomerAddresses::AddressId)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(CustomerAddresses::CustomerId)
                                .string_len(13)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerAddresses::Title)
                                .string_len(100)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerAddresses::Street)
                                .string_len(100)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerAddresses::Additional)
                                .string_len(100)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(CustomerAddresses::DistrictCity)
                                .string_len(100)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerAddresses::Province)
                                .string_len(100)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerAddresses::PostCode)
                                .string_len(100)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerAddresses::IsDefault)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(CustomerAddresses::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustomerAddresses::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_customer_addresses_customer")
                                .from(CustomerAddresses::Table, CustomerAddresses::CustomerId)
                                .to(Customers::Table, Customers::CustomerId)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_customer_addresses_customer_id")
                        .table(CustomerAddresses::Table)
                        .col(CustomerAddresses::CustomerId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CustomerAddresses::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Customers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Customers {
        Table,
        CustomerId,
        FirstName,
        LastName,
        Email,
        Phone,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum CustomerAddresses {
        Table,
        AddressId,
        CustomerId,
        Title,
        Street,
        Additional,
        DistrictCity,
        Province,
        PostCode,
        IsDefault,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000003_create_cart_lines_table {
    use super::m20250101_000002_create_customer_tables::Customers;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_cart_lines_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CartLines::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CartLines::CartLineId)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(CartLines::CustomerId)
                                .string_len(13)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CartLines::ProductSku)
                                .string_len(13)
                                .not_null(),
                        )
                        .col(ColumnDef::new(CartLines::Title).string_len(255).not_null())
                        .col(
                            ColumnDef::new(CartLines::UnitPrice)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(CartLines::Image).text().null())
                        .col(
                            ColumnDef::new(CartLines::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(CartLines::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CartLines::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_lines_customer")
                                .from(CartLines::Table, CartLines::CustomerId)
                                .to(Customers::Table, Customers::CustomerId)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // One line per (customer, sku); repeated adds merge into it
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_cart_lines_customer_sku")
                        .table(CartLines::Table)
                        .col(CartLines::CustomerId)
                        .col(CartLines::ProductSku)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CartLines::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum CartLines {
        Table,
        CartLineId,
        CustomerId,
        ProductSku,
        Title,
        UnitPrice,
        Image,
        Quantity,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000004_create_orders_tables {
    use super::m20250101_000002_create_customer_tables::Customers;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000004_create_orders_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Orders::OrderId)
                                .string_len(10)
                                .not_null()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Orders::CustomerId).string_len(13).not_null())
                        .col(
                            ColumnDef::new(Orders::CustomerFullname)
                                .string_len(200)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::CustomerEmail)
                                .string_len(255)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::CustomerPhone).string_len(20).null())
                        .col(
                            ColumnDef::new(Orders::ShippingAddressId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::ShippingAddressSnapshot)
                                .text()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::OrderDateTime)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::PaymentMethod)
                                .string_len(50)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::OrderStatus)
                                .string_len(20)
                                .not_null()
                                .default("Pending"),
                        )
                        .col(
                            ColumnDef::new(Orders::GrandTotal)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Orders::Notes).text().null())
                        .col(ColumnDef::new(Orders::ProofOfPayment).text().null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_customer")
                                .from(Orders::Table, Orders::CustomerId)
                                .to(Customers::Table, Customers::CustomerId),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_customer_id")
                        .table(Orders::Table)
                        .col(Orders::CustomerId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_order_status")
                        .table(Orders::Table)
                        .col(Orders::OrderStatus)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::OrderItemId)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).string_len(10).not_null())
                        .col(
                            ColumnDef::new(OrderItems::ProductSku)
                                .string_len(13)
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(OrderItems::PriceAtOrder)
                                .decimal_len(12, 2)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderItems::ProductTitleSnapshot)
                                .string_len(255)
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::ProductImageSnapshot).text().null())
                        .col(
                            ColumnDef::new(OrderItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::OrderId)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_order_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        OrderId,
        CustomerId,
        CustomerFullname,
        CustomerEmail,
        CustomerPhone,
        ShippingAddressId,
        ShippingAddressSnapshot,
        OrderDateTime,
        PaymentMethod,
        OrderStatus,
        GrandTotal,
        Notes,
        ProofOfPayment,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        OrderItemId,
        OrderId,
        ProductSku,
        Quantity,
        PriceAtOrder,
        ProductTitleSnapshot,
        ProductImageSnapshot,
        CreatedAt,
    }
}

mod m20250101_000005_create_id_sequences_table {
    use sea_orm_migration::prelude::*;

    /// Kinds seeded up front; the sequencer also creates missing rows lazily.
    const SEEDED_KINDS: [&str; 6] = [
        "order",
        "customer",
        "product",
        "employee",
        "department",
        "category",
    ];

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000005_create_id_sequences_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(IdSequences::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(IdSequences::Kind)
                                .string_len(32)
                                .not_null()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(IdSequences::NextValue)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .to_owned(),
                )
                .await?;

            let mut seed = Query::insert();
            seed.into_table(IdSequences::Table)
                .columns([IdSequences::Kind, IdSequences::NextValue]);
            for kind in SEEDED_KINDS {
                seed.values_panic([kind.into(), 0i64.into()]);
            }
            manager.exec_stmt(seed.to_owned()).await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(IdSequences::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum IdSequences {
        Table,
        Kind,
        NextValue,
    }
}
