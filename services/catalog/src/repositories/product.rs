//! Product repository for database operations

use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::models::{Category, ImageRef, Product, ProductInput};

/// Product repository
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    /// Create a new product repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new product owned by the given user
    pub async fn create(
        &self,
        owner: Uuid,
        input: &ProductInput,
        images: &[ImageRef],
    ) -> Result<Product> {
        info!("Creating product for user {}", owner);

        let row = sqlx::query(
            r#"
            INSERT INTO products (name, category, stock_quantity, list_price,
                                  selling_price, brand_name, images, exchange_eligible,
                                  created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, name, category, stock_quantity, list_price, selling_price,
                      brand_name, images, exchange_eligible, is_published, created_by,
                      created_at, updated_at
            "#,
        )
        .bind(&input.name)
        .bind(input.category.as_str())
        .bind(input.stock_quantity)
        .bind(input.list_price)
        .bind(input.selling_price)
        .bind(&input.brand_name)
        .bind(Json(images))
        .bind(input.exchange_eligible)
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;

        map_product(&row)
    }

    /// Find a product by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Product>> {
        info!("Finding product by ID: {}", id);

        let row = sqlx::query(
            r#"
            SELECT id, name, category, stock_quantity, list_price, selling_price,
                   brand_name, images, exchange_eligible, is_published, created_by,
                   created_at, updated_at
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(map_product(&row)?)),
            None => Ok(None),
        }
    }

    /// List products owned by a user, newest first
    ///
    /// When `published` is set, only products with that publication state are
    /// returned.
    pub async fn list_by_owner(
        &self,
        owner: Uuid,
        published: Option<bool>,
    ) -> Result<Vec<Product>> {
        info!("Listing products for user {}", owner);

        let rows = sqlx::query(
            r#"
            SELECT id, name, category, stock_quantity, list_price, selling_price,
                   brand_name, images, exchange_eligible, is_published, created_by,
                   created_at, updated_at
            FROM products
            WHERE created_by = $1 AND ($2::boolean IS NULL OR is_published = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner)
        .bind(published)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_product).collect()
    }

    /// Replace a product's details and image list
    pub async fn update(
        &self,
        id: Uuid,
        input: &ProductInput,
        images: &[ImageRef],
    ) -> Result<Option<Product>> {
        info!("Updating product {}", id);

        let row = sqlx::query(
            r#"
            UPDATE products
            SET name = $2, category = $3, stock_quantity = $4, list_price = $5,
                selling_price = $6, brand_name = $7, images = $8,
                exchange_eligible = $9, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, category, stock_quantity, list_price, selling_price,
                      brand_name, images, exchange_eligible, is_published, created_by,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(input.category.as_str())
        .bind(input.stock_quantity)
        .bind(input.list_price)
        .bind(input.selling_price)
        .bind(&input.brand_name)
        .bind(Json(images))
        .bind(input.exchange_eligible)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(map_product(&row)?)),
            None => Ok(None),
        }
    }

    /// Flip a product's publication state
    pub async fn set_published(&self, id: Uuid, published: bool) -> Result<Option<Product>> {
        info!("Setting published = {} for product {}", published, id);

        let row = sqlx::query(
            r#"
            UPDATE products
            SET is_published = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, category, stock_quantity, list_price, selling_price,
                      brand_name, images, exchange_eligible, is_published, created_by,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(published)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(map_product(&row)?)),
            None => Ok(None),
        }
    }

    /// Delete a product record
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        info!("Deleting product {}", id);

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn map_product(row: &PgRow) -> Result<Product> {
    let id: Uuid = row.get("id");
    let category: String = row.get("category");
    let category = Category::parse(&category).ok_or_else(|| {
        anyhow::anyhow!("Unknown category '{}' stored for product {}", category, id)
    })?;
    let images: Json<Vec<ImageRef>> = row.get("images");

    Ok(Product {
        id,
        name: row.get("name"),
        category,
        stock_quantity: row.get("stock_quantity"),
        list_price: row.get("list_price"),
        selling_price: row.get("selling_price"),
        brand_name: row.get("brand_name"),
        images: images.0,
        exchange_eligible: row.get("exchange_eligible"),
        is_published: row.get("is_published"),
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
