use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;

use crate::error::ApiError;
use crate::i18n;
use crate::models::{OrderQuery, PlaceOrderRequest};
use crate::services::{orders, telegram};
use crate::state::AppState;

pub async fn create_order(
    req: HttpRequest,
    data: web::Json<PlaceOrderRequest>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let locale = i18n::detect_locale(&req);
    let order_req = data.into_inner();

    if let Err(e) = state.authorize(order_req.init_data.as_deref(), order_req.telegram_id) {
        return e.to_response(locale);
    }

    let new_order = match order_req.into_new() {
        Some(new) => new,
        None => return ApiError::MissingFields.to_response(locale),
    };

    match orders::place_order(state.store.as_ref(), new_order).await {
        Ok(order) => {
            state.notify_admins(telegram::order_notice(&order));
            HttpResponse::Ok().json(json!({
                "success": true,
                "order": order
            }))
        }
        Err(e) => ApiError::from(e).to_response(locale),
    }
}

/// Orders of one user (`telegramId`), or all orders for the admin panel.
pub async fn list_orders(
    req: HttpRequest,
    query: web::Query<OrderQuery>,
    state: web::Data<AppState>,
) -> HttpResponse {
    match state.store.list_orders(query.telegram_id).await {
        Ok(orders) => HttpResponse::Ok().json(orders),
        Err(e) => ApiError::from(e).to_response(i18n::detect_locale(&req)),
    }
}
