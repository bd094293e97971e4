//! Record storage for registrations, products and orders.
//!
//! Two backends share the [`RecordStore`] contract: [`MemoryStore`] keeps
//! everything in process memory, [`SqliteStore`] persists to SQLite. They
//! differ in two places: only the SQLite store rejects a second registration
//! for the same telegram id, and only the SQLite store reports an unknown id
//! on delete.

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::{Config, StorageKind};
use crate::error::StoreError;
use crate::models::{NewOrder, NewProduct, NewRegistration, Order, Product, ProductPatch, Registration};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[async_trait]
pub trait RecordStore: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn insert_registration(&self, new: NewRegistration) -> Result<Registration, StoreError>;
    async fn pending_registrations(&self) -> Result<Vec<Registration>, StoreError>;
    /// First registration filed under `telegram_id`, if any.
    async fn registration_by_telegram_id(&self, telegram_id: i64) -> Result<Option<Registration>, StoreError>;
    /// Overwrites the status with any value; there is no transition check.
    async fn set_registration_status(&self, id: i64, status: &str) -> Result<(), StoreError>;

    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;
    async fn insert_product(&self, new: NewProduct) -> Result<Product, StoreError>;
    async fn update_product(&self, id: i64, patch: ProductPatch) -> Result<Product, StoreError>;
    async fn delete_product(&self, id: i64) -> Result<(), StoreError>;

    /// Decrements stock by `quantity` only if at least `quantity` is available,
    /// as one indivisible step.
    async fn reserve_stock(&self, product_id: i64, quantity: i64) -> Result<(), StoreError>;
    /// Gives back stock taken by [`RecordStore::reserve_stock`].
    async fn release_stock(&self, product_id: i64, quantity: i64) -> Result<(), StoreError>;

    async fn insert_order(&self, new: NewOrder) -> Result<Order, StoreError>;
    async fn list_orders(&self, telegram_id: Option<i64>) -> Result<Vec<Order>, StoreError>;
}

/// Opens the backend selected by `config`.
pub async fn open(config: &Config) -> Result<Arc<dyn RecordStore>, StoreError> {
    match config.storage {
        StorageKind::Memory => {
            info!("Using in-memory record store");
            Ok(Arc::new(MemoryStore::seeded()))
        }
        StorageKind::Sqlite => {
            match SqliteStore::connect(&config.database_url, config.database_max_connections).await {
                Ok(store) => {
                    info!(database_url = %config.database_url, "Using SQLite record store");
                    Ok(Arc::new(store))
                }
                Err(e) if config.fallback_to_memory => {
                    warn!(error = %e, "SQLite store unavailable, falling back to in-memory store");
                    Ok(Arc::new(MemoryStore::seeded()))
                }
                Err(e) => Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(vars: &[(&str, &str)]) -> Config {
        Config::from_lookup(|key| vars.iter().find(|(k, _)| *k == key).map(|(_, v)| v.to_string())).unwrap()
    }

    const UNREACHABLE_DB: &str = "sqlite:///nonexistent-dir/orders.db";

    #[tokio::test]
    async fn memory_is_the_default_backend() {
        let store = open(&config(&[])).await.unwrap();
        assert_eq!(store.backend(), "memory");
        assert_eq!(store.list_products().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn sqlite_is_selected_by_storage() {
        let store = open(&config(&[
            ("STORAGE", "sqlite"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("DATABASE_MAX_CONNECTIONS", "1"),
        ]))
        .await
        .unwrap();
        assert_eq!(store.backend(), "sqlite");
    }

    #[tokio::test]
    async fn unreachable_database_is_fatal_by_default() {
        let result = open(&config(&[("STORAGE", "sqlite"), ("DATABASE_URL", UNREACHABLE_DB)])).await;
        assert!(matches!(result, Err(StoreError::Database(_))));
    }

    #[tokio::test]
    async fn unreachable_database_falls_back_when_allowed() {
        let store = open(&config(&[
            ("STORAGE", "sqlite"),
            ("DATABASE_URL", UNREACHABLE_DB),
            ("STORE_FALLBACK_TO_MEMORY", "true"),
        ]))
        .await
        .unwrap();
        assert_eq!(store.backend(), "memory");
        assert_eq!(store.list_products().await.unwrap().len(), 2);
    }
}

#[cfg(test)]
pub(crate) mod contract {
    //! Behaviour both backends must share, run against each in their own test modules.

    use std::sync::Arc;

    use super::RecordStore;
    use crate::error::StoreError;
    use crate::models::{NewOrder, NewProduct, NewRegistration, ProductPatch, STATUS_PENDING};

    pub fn registration(telegram_id: i64, name: &str) -> NewRegistration {
        NewRegistration {
            telegram_id,
            name: name.to_string(),
            email: Some(format!("{}@example.com", telegram_id)),
            company_name: Some("ООО Ромашка".to_string()),
            phone: None,
        }
    }

    pub async fn registration_review(store: &dyn RecordStore) {
        let first = store.insert_registration(registration(100, "Anna")).await.unwrap();
        let second = store.insert_registration(registration(200, "Boris")).await.unwrap();
        assert_eq!(first.status, STATUS_PENDING);
        assert_ne!(first.id, second.id);

        let pending = store.pending_registrations().await.unwrap();
        assert_eq!(pending.len(), 2);

        store.set_registration_status(first.id, "approved").await.unwrap();
        store.set_registration_status(second.id, "on-hold until friday").await.unwrap();

        assert!(store.pending_registrations().await.unwrap().is_empty());
        let found = store.registration_by_telegram_id(200).await.unwrap().unwrap();
        assert_eq!(found.status, "on-hold until friday");
        assert!(store.registration_by_telegram_id(300).await.unwrap().is_none());

        let err = store.set_registration_status(9_999, "approved").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "registration", id: 9_999 }));
    }

    pub async fn catalog_management(store: &dyn RecordStore) {
        let created = store
            .insert_product(NewProduct { name: "Гайки".to_string(), stock: 10 })
            .await
            .unwrap();
        assert!(store.list_products().await.unwrap().contains(&created));

        let renamed = store
            .update_product(created.id, ProductPatch { name: Some("Гайки М8".to_string()), stock: None })
            .await
            .unwrap();
        assert_eq!(renamed.name, "Гайки М8");
        assert_eq!(renamed.stock, 10);

        let restocked = store
            .update_product(created.id, ProductPatch { name: None, stock: Some(25) })
            .await
            .unwrap();
        assert_eq!(restocked.name, "Гайки М8");
        assert_eq!(restocked.stock, 25);

        let err = store.update_product(9_999, ProductPatch::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "product", .. }));

        store.delete_product(created.id).await.unwrap();
        assert!(store.list_products().await.unwrap().iter().all(|p| p.id != created.id));
    }

    pub async fn order_stock_accounting(store: &dyn RecordStore) {
        let product = store
            .insert_product(NewProduct { name: "Шайбы".to_string(), stock: 50 })
            .await
            .unwrap();

        let err = store.reserve_stock(product.id, 60).await.unwrap_err();
        assert!(matches!(err, StoreError::InsufficientStock { requested: 60, available: 50, .. }));

        let err = store.reserve_stock(9_999, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "product", .. }));

        store.reserve_stock(product.id, 20).await.unwrap();
        store.reserve_stock(product.id, 30).await.unwrap();
        assert!(store.reserve_stock(product.id, 1).await.is_err());
        store.release_stock(product.id, 5).await.unwrap();
        assert_eq!(stock_of(store, product.id).await, 5);

        let order = store
            .insert_order(NewOrder { telegram_id: 100, product_id: product.id, quantity: 3 })
            .await
            .unwrap();
        store
            .insert_order(NewOrder { telegram_id: 200, product_id: product.id, quantity: 1 })
            .await
            .unwrap();
        assert_eq!(order.status, "pending");

        let mine = store.list_orders(Some(100)).await.unwrap();
        assert_eq!(mine, vec![order]);
        assert_eq!(store.list_orders(None).await.unwrap().len(), 2);
    }

    /// Many concurrent reservations against one product never overdraw it.
    pub async fn concurrent_reservations(store: Arc<dyn RecordStore>) {
        let product = store
            .insert_product(NewProduct { name: "Саморезы".to_string(), stock: 100 })
            .await
            .unwrap();

        let handles: Vec<_> = (0..25)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.reserve_stock(product.id, 10).await.is_ok() })
            })
            .collect();

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 10);
        assert_eq!(stock_of(store.as_ref(), product.id).await, 0);
    }

    pub async fn stock_of(store: &dyn RecordStore, product_id: i64) -> i64 {
        store
            .list_products()
            .await
            .unwrap()
            .into_iter()
            .find(|p| p.id == product_id)
            .map(|p| p.stock)
            .unwrap()
    }
}
