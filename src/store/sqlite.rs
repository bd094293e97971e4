use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use super::RecordStore;
use crate::db;
use crate::error::StoreError;
use crate::models::{
    NewOrder, NewProduct, NewRegistration, Order, Product, ProductPatch, Registration, ORDER_STATUS_PENDING,
    STATUS_PENDING,
};

/// Durable store on SQLite. Telegram ids are unique per registration.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = db::init_pool(database_url, max_connections).await?;
        Ok(Self { pool })
    }

    async fn product(&self, id: i64) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query("SELECT id, name, stock FROM products WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| product_from_row(&r)))
    }
}

fn registration_from_row(r: &SqliteRow) -> Registration {
    Registration {
        id: r.get::<i64, _>("id"),
        telegram_id: r.get::<i64, _>("telegram_id"),
        name: r.get::<String, _>("name"),
        email: r.try_get::<Option<String>, _>("email").unwrap_or(None),
        company_name: r.try_get::<Option<String>, _>("company_name").unwrap_or(None),
        phone: r.try_get::<Option<String>, _>("phone").unwrap_or(None),
        status: r.get::<String, _>("status"),
        created_at: r.get::<String, _>("created_at"),
    }
}

fn product_from_row(r: &SqliteRow) -> Product {
    Product {
        id: r.get::<i64, _>("id"),
        name: r.get::<String, _>("name"),
        stock: r.get::<i64, _>("stock"),
    }
}

fn order_from_row(r: &SqliteRow) -> Order {
    Order {
        id: r.get::<i64, _>("id"),
        telegram_id: r.get::<i64, _>("telegram_id"),
        product_id: r.get::<i64, _>("product_id"),
        quantity: r.get::<i64, _>("quantity"),
        status: r.get::<String, _>("status"),
        created_at: r.get::<String, _>("created_at"),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.message().contains("UNIQUE constraint failed"),
        _ => false,
    }
}

const REGISTRATION_COLUMNS: &str = "id, telegram_id, name, email, company_name, phone, status, created_at";
const ORDER_COLUMNS: &str = "id, telegram_id, product_id, quantity, status, created_at";

#[async_trait]
impl RecordStore for SqliteStore {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn insert_registration(&self, new: NewRegistration) -> Result<Registration, StoreError> {
        // check existing registration
        let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(1) FROM registrations WHERE telegram_id = ?")
            .bind(new.telegram_id)
            .fetch_one(&self.pool)
            .await?;
        if existing > 0 {
            return Err(StoreError::DuplicateTelegramId(new.telegram_id));
        }

        let created_at = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO registrations (telegram_id, name, email, company_name, phone, status, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(new.telegram_id)
        .bind(&new.name)
        .bind(&new.email)
        .bind(&new.company_name)
        .bind(&new.phone)
        .bind(STATUS_PENDING)
        .bind(&created_at)
        .execute(&self.pool)
        .await;

        // A concurrent insert can still slip past the count check
        let result = match result {
            Ok(r) => r,
            Err(e) if is_unique_violation(&e) => return Err(StoreError::DuplicateTelegramId(new.telegram_id)),
            Err(e) => return Err(e.into()),
        };

        Ok(Registration {
            id: result.last_insert_rowid(),
            telegram_id: new.telegram_id,
            name: new.name,
            email: new.email,
            company_name: new.company_name,
            phone: new.phone,
            status: STATUS_PENDING.to_string(),
            created_at,
        })
    }

    async fn pending_registrations(&self) -> Result<Vec<Registration>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM registrations WHERE status = ? ORDER BY id",
            REGISTRATION_COLUMNS
        ))
        .bind(STATUS_PENDING)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(registration_from_row).collect())
    }

    async fn registration_by_telegram_id(&self, telegram_id: i64) -> Result<Option<Registration>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM registrations WHERE telegram_id = ? ORDER BY id LIMIT 1",
            REGISTRATION_COLUMNS
        ))
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(registration_from_row))
    }

    async fn set_registration_status(&self, id: i64, status: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE registrations SET status = ? WHERE id = ?")
            .bind(status)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "registration", id });
        }
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query("SELECT id, name, stock FROM products ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(product_from_row).collect())
    }

    async fn insert_product(&self, new: NewProduct) -> Result<Product, StoreError> {
        let result = sqlx::query("INSERT INTO products (name, stock) VALUES (?, ?)")
            .bind(&new.name)
            .bind(new.stock)
            .execute(&self.pool)
            .await?;
        Ok(Product {
            id: result.last_insert_rowid(),
            name: new.name,
            stock: new.stock,
        })
    }

    async fn update_product(&self, id: i64, patch: ProductPatch) -> Result<Product, StoreError> {
        let result = sqlx::query("UPDATE products SET name = COALESCE(?, name), stock = COALESCE(?, stock) WHERE id = ?")
            .bind(patch.name)
            .bind(patch.stock)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "product", id });
        }
        self.product(id)
            .await?
            .ok_or(StoreError::NotFound { entity: "product", id })
    }

    async fn delete_product(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { entity: "product", id });
        }
        Ok(())
    }

    async fn reserve_stock(&self, product_id: i64, quantity: i64) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE products SET stock = stock - ? WHERE id = ? AND stock >= ?")
            .bind(quantity)
            .bind(product_id)
            .bind(quantity)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 1 {
            return Ok(());
        }

        // Nothing changed: tell a missing product apart from a short one
        match self.product(product_id).await? {
            None => Err(StoreError::NotFound { entity: "product", id: product_id }),
            Some(product) => {
                debug!(product_id, requested = quantity, available = product.stock, "Stock reservation refused");
                Err(StoreError::InsufficientStock {
                    product_id,
                    requested: quantity,
                    available: product.stock,
                })
            }
        }
    }

    async fn release_stock(&self, product_id: i64, quantity: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE products SET stock = stock + ? WHERE id = ?")
            .bind(quantity)
            .bind(product_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_order(&self, new: NewOrder) -> Result<Order, StoreError> {
        let created_at = chrono::Utc::now().to_rfc3339();
        let result = sqlx::query(
            "INSERT INTO orders (telegram_id, product_id, quantity, status, created_at) VALUES (?, ?, ?, ?, ?)"
        )
        .bind(new.telegram_id)
        .bind(new.product_id)
        .bind(new.quantity)
        .bind(ORDER_STATUS_PENDING)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;

        Ok(Order {
            id: result.last_insert_rowid(),
            telegram_id: new.telegram_id,
            product_id: new.product_id,
            quantity: new.quantity,
            status: ORDER_STATUS_PENDING.to_string(),
            created_at,
        })
    }

    async fn list_orders(&self, telegram_id: Option<i64>) -> Result<Vec<Order>, StoreError> {
        let rows = match telegram_id {
            Some(telegram_id) => {
                sqlx::query(&format!("SELECT {} FROM orders WHERE telegram_id = ? ORDER BY id", ORDER_COLUMNS))
                    .bind(telegram_id)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query(&format!("SELECT {} FROM orders ORDER BY id", ORDER_COLUMNS))
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        Ok(rows.iter().map(order_from_row).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::store::contract;

    // A single connection keeps every query on the same in-memory database.
    async fn store() -> SqliteStore {
        SqliteStore::connect("sqlite::memory:", 1).await.unwrap()
    }

    #[tokio::test]
    async fn fresh_database_is_seeded() {
        let store = store().await;
        let names: Vec<String> = store.list_products().await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Продукт A".to_string(), "Продукт B".to_string()]);
    }

    #[tokio::test]
    async fn emptied_catalog_stays_empty_after_restart() {
        let path = std::env::temp_dir().join(format!("orders-restart-{}.db", std::process::id()));
        let url = format!("sqlite://{}", path.display());
        let _ = std::fs::remove_file(&path);

        let store = SqliteStore::connect(&url, 1).await.unwrap();
        for product in store.list_products().await.unwrap() {
            store.delete_product(product.id).await.unwrap();
        }
        store.pool.close().await;

        let reopened = SqliteStore::connect(&url, 1).await.unwrap();
        let products = reopened.list_products().await.unwrap();
        reopened.pool.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }

        assert!(products.is_empty());
    }

    #[tokio::test]
    async fn registration_review() {
        contract::registration_review(&store().await).await;
    }

    #[tokio::test]
    async fn catalog_management() {
        contract::catalog_management(&store().await).await;
    }

    #[tokio::test]
    async fn order_stock_accounting() {
        contract::order_stock_accounting(&store().await).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reservations() {
        contract::concurrent_reservations(Arc::new(store().await)).await;
    }

    #[tokio::test]
    async fn rejects_duplicate_telegram_ids() {
        let store = store().await;
        store.insert_registration(contract::registration(7, "Anna")).await.unwrap();
        let err = store.insert_registration(contract::registration(7, "Anna")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateTelegramId(7)));
        assert_eq!(store.pending_registrations().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_of_unknown_product_is_not_found() {
        let store = store().await;
        let err = store.delete_product(42).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "product", id: 42 }));
    }

    #[tokio::test]
    async fn stock_survives_failed_reservation() {
        let store = store().await;
        assert!(store.reserve_stock(2, 60).await.is_err());
        assert_eq!(contract::stock_of(&store, 2).await, 50);
    }
}
