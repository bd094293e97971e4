use serde::{Deserialize, Serialize};

use super::lenient;
use super::registration::non_empty;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub stock: i64,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub stock: i64,
}

/// Partial update; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub stock: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub stock: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub stock: Option<i64>,
}

impl CreateProductRequest {
    pub fn into_new(self) -> Option<NewProduct> {
        Some(NewProduct {
            name: non_empty(self.name)?,
            stock: self.stock?,
        })
    }
}

impl UpdateProductRequest {
    pub fn into_patch(self) -> ProductPatch {
        ProductPatch {
            name: non_empty(self.name),
            stock: self.stock,
        }
    }
}

pub fn seed_catalog() -> Vec<NewProduct> {
    vec![
        NewProduct { name: "Продукт A".to_string(), stock: 100 },
        NewProduct { name: "Продукт B".to_string(), stock: 50 },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_in_update_keeps_current_name() {
        let req: UpdateProductRequest = serde_json::from_str(r#"{"name": "", "stock": "15"}"#).unwrap();
        let patch = req.into_patch();
        assert_eq!(patch.name, None);
        assert_eq!(patch.stock, Some(15));
    }

    #[test]
    fn create_requires_name_and_stock() {
        let req: CreateProductRequest = serde_json::from_str(r#"{"name": "Болты"}"#).unwrap();
        assert!(req.into_new().is_none());

        let req: CreateProductRequest = serde_json::from_str(r#"{"name": "Болты", "stock": 0}"#).unwrap();
        let new = req.into_new().unwrap();
        assert_eq!(new.stock, 0);
    }
}
