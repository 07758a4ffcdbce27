//! Schema bootstrap for the catalog service

use common::error::{DatabaseError, DatabaseResult};
use sqlx::PgPool;
use tracing::info;

const SCHEMA_STATEMENTS: [&str; 5] = [
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        email TEXT UNIQUE,
        phone TEXT UNIQUE,
        otp_code TEXT,
        otp_expires_at TIMESTAMPTZ,
        is_verified BOOLEAN NOT NULL DEFAULT FALSE,
        last_login_at TIMESTAMPTZ,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
        name TEXT NOT NULL,
        category TEXT NOT NULL,
        stock_quantity INTEGER NOT NULL,
        list_price DOUBLE PRECISION NOT NULL,
        selling_price DOUBLE PRECISION NOT NULL,
        brand_name TEXT NOT NULL,
        images JSONB NOT NULL DEFAULT '[]'::jsonb,
        exchange_eligible BOOLEAN NOT NULL DEFAULT FALSE,
        is_published BOOLEAN NOT NULL DEFAULT FALSE,
        created_by UUID NOT NULL REFERENCES users(id),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_products_created_by ON products (created_by)",
    "CREATE INDEX IF NOT EXISTS idx_products_owner_published \
     ON products (created_by, is_published)",
    "CREATE INDEX IF NOT EXISTS idx_products_category ON products (category)",
];

/// Create the catalog tables and indexes if they do not exist yet
///
/// Every statement is idempotent, so running this on every startup is safe.
pub async fn init_schema(pool: &PgPool) -> DatabaseResult<()> {
    info!("Ensuring catalog schema");

    for statement in SCHEMA_STATEMENTS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| DatabaseError::Schema(e.to_string()))?;
    }

    info!("Catalog schema ready");
    Ok(())
}
