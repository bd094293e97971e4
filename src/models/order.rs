use serde::{Deserialize, Serialize};

use super::lenient;

pub const ORDER_STATUS_PENDING: &str = "pending";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub telegram_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub telegram_id: i64,
    pub product_id: i64,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub telegram_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub product_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub quantity: Option<i64>,
    pub init_data: Option<String>,
}

impl PlaceOrderRequest {
    pub fn into_new(self) -> Option<NewOrder> {
        Some(NewOrder {
            telegram_id: self.telegram_id?,
            product_id: self.product_id?,
            quantity: self.quantity?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderQuery {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub telegram_id: Option<i64>,
}
