use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Reference data: categories and brands
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(pk_uuid(Categories::Id))
                    .col(string(Categories::Name))
                    .col(string_uniq(Categories::Slug))
                    .col(
                        timestamp_with_time_zone(Categories::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Categories::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Brands::Table)
                    .if_not_exists()
                    .col(pk_uuid(Brands::Id))
                    .col(string(Brands::Name))
                    .col(string_uniq(Brands::Slug))
                    .col(
                        timestamp_with_time_zone(Brands::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Brands::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Products
        manager
            .create_table(
                Table::create()
                    .table(Products::Table)
                    .if_not_exists()
                    .col(pk_uuid(Products::Id))
                    .col(string(Products::Name))
                    .col(string_uniq(Products::Slug))
                    .col(text_null(Products::Description))
                    .col(uuid(Products::CategoryId))
                    .col(uuid_null(Products::BrandId))
                    .col(big_integer(Products::BasePriceCents))
                    .col(boolean(Products::IsPublished).default(false))
                    .col(
                        timestamp_with_time_zone(Products::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Products::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(uuid(Products::VersionToken))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_products_category_id")
                            .from(Products::Table, Products::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_products_brand_id")
                            .from(Products::Table, Products::BrandId)
                            .to(Brands::Table, Brands::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        // Variants: owned by a product, cascade on product removal
        manager
            .create_table(
                Table::create()
                    .table(ProductVariants::Table)
                    .if_not_exists()
                    .col(pk_uuid(ProductVariants::Id))
                    .col(uuid(ProductVariants::ProductId))
                    .col(string_len(ProductVariants::Sku, 64))
                    .col(string_len_null(ProductVariants::Color, 64))
                    .col(string_len_null(ProductVariants::Size, 64))
                    .col(big_integer(ProductVariants::AdditionalPriceCents))
                    .col(boolean(ProductVariants::IsActive).default(true))
                    .col(
                        timestamp_with_time_zone(ProductVariants::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(ProductVariants::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(uuid(ProductVariants::VersionToken))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_variants_product_id")
                            .from(ProductVariants::Table, ProductVariants::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // SKU unique per product, not globally
        manager
            .create_index(
                Index::create()
                    .name("ux_product_variants_product_id_sku")
                    .table(ProductVariants::Table)
                    .col(ProductVariants::ProductId)
                    .col(ProductVariants::Sku)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Images: fully replaced on every product update
        manager
            .create_table(
                Table::create()
                    .table(ProductImages::Table)
                    .if_not_exists()
                    .col(pk_uuid(ProductImages::Id))
                    .col(uuid(ProductImages::ProductId))
                    .col(text(ProductImages::ImageUrl))
                    .col(boolean(ProductImages::IsPrimary).default(false))
                    .col(integer(ProductImages::SortOrder))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_product_images_product_id")
                            .from(ProductImages::Table, ProductImages::ProductId)
                            .to(Products::Table, Products::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_product_images_product_id")
                    .table(ProductImages::Table)
                    .col(ProductImages::ProductId)
                    .to_owned(),
            )
            .await?;

        // Inventory: at most one row per variant, cascade on variant removal
        manager
            .create_table(
                Table::create()
                    .table(Inventories::Table)
                    .if_not_exists()
                    .col(pk_uuid(Inventories::Id))
                    .col(uuid(Inventories::ProductVariantId))
                    .col(integer(Inventories::Quantity))
                    .col(integer(Inventories::Reserved).default(0))
                    .col(
                        timestamp_with_time_zone(Inventories::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(uuid(Inventories::VersionToken))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventories_product_variant_id")
                            .from(Inventories::Table, Inventories::ProductVariantId)
                            .to(ProductVariants::Table, ProductVariants::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("ux_inventories_product_variant_id")
                    .table(Inventories::Table)
                    .col(Inventories::ProductVariantId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_products_category_id")
                    .table(Products::Table)
                    .col(Products::CategoryId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_products_created_at")
                    .table(Products::Table)
                    .col(Products::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Inventories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProductImages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ProductVariants::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Products::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Brands::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    Name,
    Slug,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Brands {
    Table,
    Id,
    Name,
    Slug,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Products {
    Table,
    Id,
    Name,
    Slug,
    Description,
    CategoryId,
    BrandId,
    BasePriceCents,
    IsPublished,
    CreatedAt,
    UpdatedAt,
    VersionToken,
}

#[derive(DeriveIden)]
enum ProductVariants {
    Table,
    Id,
    ProductId,
    Sku,
    Color,
    Size,
    AdditionalPriceCents,
    IsActive,
    CreatedAt,
    UpdatedAt,
    VersionToken,
}

#[derive(DeriveIden)]
enum ProductImages {
    Table,
    Id,
    ProductId,
    ImageUrl,
    IsPrimary,
    SortOrder,
}

#[derive(DeriveIden)]
enum Inventories {
    Table,
    Id,
    ProductVariantId,
    Quantity,
    Reserved,
    UpdatedAt,
    VersionToken,
}
