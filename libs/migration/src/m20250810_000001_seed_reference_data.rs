use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Reference categories
        manager
            .get_connection()
            .execute_unprepared(
                r#"
            INSERT INTO categories (id, name, slug, created_at, updated_at)
            VALUES
                ('01990000-0000-7000-8000-000000000001', 'Apparel', 'apparel', NOW(), NOW()),
                ('01990000-0000-7000-8000-000000000002', 'Footwear', 'footwear', NOW(), NOW()),
                ('01990000-0000-7000-8000-000000000003', 'Accessories', 'accessories', NOW(), NOW())
            ON CONFLICT (id) DO NOTHING
            "#,
            )
            .await?;

        // Reference brands
        manager
            .get_connection()
            .execute_unprepared(
                r#"
            INSERT INTO brands (id, name, slug, created_at, updated_at)
            VALUES
                ('01990000-0000-7000-8000-000000000101', 'Northwind', 'northwind', NOW(), NOW()),
                ('01990000-0000-7000-8000-000000000102', 'Contoso', 'contoso', NOW(), NOW())
            ON CONFLICT (id) DO NOTHING
            "#,
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared(
                "DELETE FROM brands WHERE slug IN ('northwind', 'contoso');
                 DELETE FROM categories WHERE slug IN ('apparel', 'footwear', 'accessories')",
            )
            .await?;

        Ok(())
    }
}
