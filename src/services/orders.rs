use thiserror::Error;
use tracing::{error, info};

use crate::error::StoreError;
use crate::models::{NewOrder, Order};
use crate::store::RecordStore;

#[derive(Debug, Error)]
pub enum PlaceOrderError {
    #[error("quantity must be positive, got {0}")]
    InvalidQuantity(i64),
    #[error("product {product_id} is unknown or has fewer than {requested} units")]
    Unavailable { product_id: i64, requested: i64 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Places an order: reserves the stock, then records the order.
///
/// The reservation is a conditional decrement, so two requests can never both
/// take the last units. If recording the order fails the reservation is given
/// back before the error is returned.
pub async fn place_order(store: &dyn RecordStore, new: NewOrder) -> Result<Order, PlaceOrderError> {
    if new.quantity < 1 {
        return Err(PlaceOrderError::InvalidQuantity(new.quantity));
    }

    match store.reserve_stock(new.product_id, new.quantity).await {
        Ok(()) => {}
        Err(StoreError::NotFound { .. }) | Err(StoreError::InsufficientStock { .. }) => {
            info!(product_id = new.product_id, quantity = new.quantity, "Order refused: product unavailable");
            return Err(PlaceOrderError::Unavailable {
                product_id: new.product_id,
                requested: new.quantity,
            });
        }
        Err(e) => return Err(e.into()),
    }

    let (product_id, quantity) = (new.product_id, new.quantity);
    match store.insert_order(new).await {
        Ok(order) => {
            info!(order_id = order.id, product_id, quantity, telegram_id = order.telegram_id, "Order placed");
            Ok(order)
        }
        Err(e) => {
            if let Err(release_err) = store.release_stock(product_id, quantity).await {
                error!(product_id, quantity, error = %release_err, "Failed to release reserved stock");
            }
            Err(e.into())
        }
    }
}
