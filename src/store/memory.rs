use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tracing::debug;

use super::RecordStore;
use crate::error::StoreError;
use crate::models::{
    seed_catalog, NewOrder, NewProduct, NewRegistration, Order, Product, ProductPatch, Registration,
    ORDER_STATUS_PENDING, STATUS_PENDING,
};

#[derive(Default)]
struct Collections {
    registrations: Vec<Registration>,
    products: Vec<Product>,
    orders: Vec<Order>,
    last_registration_id: i64,
    last_product_id: i64,
    last_order_id: i64,
}

fn next_id(last: &mut i64) -> i64 {
    *last += 1;
    *last
}

/// Volatile store. Contents live as long as the process.
///
/// Identifiers come from per-collection counters, so a deleted product's id
/// is never handed out again.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
}

impl MemoryStore {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with the default catalog.
    pub fn seeded() -> Self {
        let mut collections = Collections::default();
        for NewProduct { name, stock } in seed_catalog() {
            let id = next_id(&mut collections.last_product_id);
            collections.products.push(Product { id, name, stock });
        }
        Self { inner: Mutex::new(collections) }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    // Duplicate telegram ids are accepted here.
    async fn insert_registration(&self, new: NewRegistration) -> Result<Registration, StoreError> {
        let mut c = self.lock()?;
        let registration = Registration {
            id: next_id(&mut c.last_registration_id),
            telegram_id: new.telegram_id,
            name: new.name,
            email: new.email,
            company_name: new.company_name,
            phone: new.phone,
            status: STATUS_PENDING.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        c.registrations.push(registration.clone());
        Ok(registration)
    }

    async fn pending_registrations(&self) -> Result<Vec<Registration>, StoreError> {
        let c = self.lock()?;
        Ok(c.registrations.iter().filter(|r| r.status == STATUS_PENDING).cloned().collect())
    }

    async fn registration_by_telegram_id(&self, telegram_id: i64) -> Result<Option<Registration>, StoreError> {
        let c = self.lock()?;
        Ok(c.registrations.iter().find(|r| r.telegram_id == telegram_id).cloned())
    }

    async fn set_registration_status(&self, id: i64, status: &str) -> Result<(), StoreError> {
        let mut c = self.lock()?;
        let registration = c
            .registrations
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::NotFound { entity: "registration", id })?;
        registration.status = status.to_string();
        Ok(())
    }

    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        Ok(self.lock()?.products.clone())
    }

    async fn insert_product(&self, new: NewProduct) -> Result<Product, StoreError> {
        let mut c = self.lock()?;
        let product = Product {
            id: next_id(&mut c.last_product_id),
            name: new.name,
            stock: new.stock,
        };
        c.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: i64, patch: ProductPatch) -> Result<Product, StoreError> {
        let mut c = self.lock()?;
        let product = c
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound { entity: "product", id })?;
        if let Some(name) = patch.name {
            product.name = name;
        }
        if let Some(stock) = patch.stock {
            product.stock = stock;
        }
        Ok(product.clone())
    }

    // Unknown ids are not an error here.
    async fn delete_product(&self, id: i64) -> Result<(), StoreError> {
        let mut c = self.lock()?;
        let before = c.products.len();
        c.products.retain(|p| p.id != id);
        debug!(product_id = id, removed = before - c.products.len(), "Deleted product");
        Ok(())
    }

    async fn reserve_stock(&self, product_id: i64, quantity: i64) -> Result<(), StoreError> {
        let mut c = self.lock()?;
        let product = c
            .products
            .iter_mut()
            .find(|p| p.id == product_id)
            .ok_or(StoreError::NotFound { entity: "product", id: product_id })?;
        if product.stock < quantity {
            return Err(StoreError::InsufficientStock {
                product_id,
                requested: quantity,
                available: product.stock,
            });
        }
        product.stock -= quantity;
        Ok(())
    }

    async fn release_stock(&self, product_id: i64, quantity: i64) -> Result<(), StoreError> {
        let mut c = self.lock()?;
        // The product may have been deleted in between; nothing to give back then.
        if let Some(product) = c.products.iter_mut().find(|p| p.id == product_id) {
            product.stock += quantity;
        }
        Ok(())
    }

    async fn insert_order(&self, new: NewOrder) -> Result<Order, StoreError> {
        let mut c = self.lock()?;
        let order = Order {
            id: next_id(&mut c.last_order_id),
            telegram_id: new.telegram_id,
            product_id: new.product_id,
            quantity: new.quantity,
            status: ORDER_STATUS_PENDING.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        c.orders.push(order.clone());
        Ok(order)
    }

    async fn list_orders(&self, telegram_id: Option<i64>) -> Result<Vec<Order>, StoreError> {
        let c = self.lock()?;
        Ok(c
            .orders
            .iter()
            .filter(|o| telegram_id.map_or(true, |t| o.telegram_id == t))
            .cloned()
            .collect())
    }
}
