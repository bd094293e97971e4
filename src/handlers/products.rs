use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use tracing::info;

use crate::error::ApiError;
use crate::i18n;
use crate::models::{CreateProductRequest, UpdateProductRequest};
use crate::state::AppState;

pub async fn list_products(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    match state.store.list_products().await {
        Ok(products) => HttpResponse::Ok().json(products),
        Err(e) => ApiError::from(e).to_response(i18n::detect_locale(&req)),
    }
}

pub async fn create_product(
    req: HttpRequest,
    data: web::Json<CreateProductRequest>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let locale = i18n::detect_locale(&req);

    let new_product = match data.into_inner().into_new() {
        Some(p) => p,
        None => return ApiError::MissingFields.to_response(locale),
    };
    if new_product.stock < 0 {
        return ApiError::InvalidStock.to_response(locale);
    }

    match state.store.insert_product(new_product).await {
        Ok(product) => {
            info!(product_id = product.id, stock = product.stock, "Product created");
            HttpResponse::Ok().json(json!({ "success": true, "product": product }))
        }
        Err(e) => ApiError::from(e).to_response(locale),
    }
}

pub async fn update_product(
    req: HttpRequest,
    path: web::Path<i64>,
    data: web::Json<UpdateProductRequest>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let locale = i18n::detect_locale(&req);
    let id = path.into_inner();

    let patch = data.into_inner().into_patch();
    if patch.stock.map_or(false, |s| s < 0) {
        return ApiError::InvalidStock.to_response(locale);
    }

    match state.store.update_product(id, patch).await {
        Ok(product) => {
            info!(product_id = id, stock = product.stock, "Product updated");
            HttpResponse::Ok().json(json!({ "success": true, "product": product }))
        }
        Err(e) => ApiError::from(e).to_response(locale),
    }
}

pub async fn delete_product(
    req: HttpRequest,
    path: web::Path<i64>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let id = path.into_inner();
    match state.store.delete_product(id).await {
        Ok(()) => {
            info!(product_id = id, "Product deleted");
            HttpResponse::Ok().json(json!({ "success": true }))
        }
        Err(e) => ApiError::from(e).to_response(i18n::detect_locale(&req)),
    }
}
