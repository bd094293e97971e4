use sqlx::{sqlite::{SqlitePoolOptions, SqliteConnectOptions}, SqlitePool};
use std::str::FromStr;

use crate::models::seed_catalog;

pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<SqlitePool, sqlx::Error> {
    let connect_opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(connect_opts)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS registrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            telegram_id INTEGER NOT NULL UNIQUE,
            name TEXT NOT NULL,
            email TEXT,
            company_name TEXT,
            phone TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(&pool)
    .await?;

    let products_existed = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(1) FROM sqlite_master WHERE type = 'table' AND name = 'products'",
    )
    .fetch_one(&pool)
    .await?
        > 0;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            stock INTEGER NOT NULL CHECK(stock >= 0)
        );
        "#,
    )
    .execute(&pool)
    .await?;

    // No FOREIGN KEY on product_id: orders outlive deleted products
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS orders (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            telegram_id INTEGER NOT NULL,
            product_id INTEGER NOT NULL,
            quantity INTEGER NOT NULL CHECK(quantity > 0),
            status TEXT NOT NULL DEFAULT 'pending',
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_telegram_id ON orders(telegram_id);")
        .execute(&pool)
        .await?;

    // Seed only a freshly created products table; an emptied catalog stays empty.
    if !products_existed {
        for product in seed_catalog() {
            sqlx::query("INSERT INTO products (name, stock) VALUES (?, ?)")
                .bind(&product.name)
                .bind(product.stock)
                .execute(&pool)
                .await?;
        }
    }

    Ok(pool)
}
