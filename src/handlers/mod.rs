pub mod registrations;
pub mod products;
pub mod orders;
pub mod webhook;

use actix_web::body::EitherBody;
use actix_web::dev::ServiceResponse;
use actix_web::http::header;
use actix_web::middleware::ErrorHandlerResponse;
use actix_web::error::InternalError;
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use tracing::{error, warn};

use crate::error::ApiError;
use crate::i18n::{self, Locale};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .route("/", web::get().to(main))
        .route("/health", web::get().to(health_check))

        .route("/api/register", web::post().to(registrations::register))
        .route("/api/registrations", web::get().to(registrations::list_or_lookup))
        .route("/api/registrations/{id}", web::post().to(registrations::update_status))

        .route("/api/products", web::get().to(products::list_products))
        .route("/api/products", web::post().to(products::create_product))
        .route("/api/products/{id}", web::put().to(products::update_product))
        .route("/api/products/{id}", web::delete().to(products::delete_product))

        .route("/api/orders", web::post().to(orders::create_order))
        .route("/api/orders", web::get().to(orders::list_orders))

        .route("/webhook", web::post().to(webhook::telegram_update));
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, req| {
        warn!(path = %req.path(), error = %err, "Rejected request body");
        let response = ApiError::MalformedRequest.to_response(i18n::detect_locale(req));
        InternalError::from_response(err, response).into()
    })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, req| {
        warn!(path = %req.path(), error = %err, "Rejected query string");
        let response = ApiError::MalformedRequest.to_response(i18n::detect_locale(req));
        InternalError::from_response(err, response).into()
    })
}

// Every path parameter is a numeric id, so an unparsable one names no record.
fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, req| {
        warn!(path = %req.path(), error = %err, "Rejected path parameter");
        let not_found = if req.path().starts_with("/api/registrations") {
            ApiError::RegistrationNotFound
        } else {
            ApiError::ProductNotFound
        };
        let response = not_found.to_response(i18n::detect_locale(req));
        InternalError::from_response(err, response).into()
    })
}

pub async fn main(req: HttpRequest) -> HttpResponse {
    let message = match i18n::detect_locale(&req) {
        Locale::Ru => "API работает",
        Locale::En => "API is running",
    };
    HttpResponse::Ok().json(json!({ "message": message }))
}

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Last line of defence for 500s that did not come from our own error bodies.
pub fn internal_error<B>(res: ServiceResponse<B>) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let is_json = res
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |ct| ct.starts_with("application/json"));
    if is_json {
        return Ok(ErrorHandlerResponse::Response(res.map_into_left_body()));
    }

    error!(path = %res.request().path(), "Unhandled internal server error");
    let locale = i18n::detect_locale(res.request());
    let (req, _) = res.into_parts();
    let body = ApiError::Internal("unhandled".to_string()).message(locale);
    let response = HttpResponse::InternalServerError().json(json!({ "success": false, "error": body }));
    let res: ServiceResponse<EitherBody<B>> = ServiceResponse::new(req, response).map_into_right_body();
    Ok(ErrorHandlerResponse::Response(res))
}


#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::middleware::ErrorHandlers;
    use actix_web::{test, App};
    use serde_json::Value;

    use super::test_support::{app, state};
    use super::*;
    use crate::store::MemoryStore;

    #[actix_web::test]
    async fn root_reports_running_api() {
        let state = state(MemoryStore::seeded());
        let app = app!(state);
        let body: Value = test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(body["message"], "API работает");

        let req = test::TestRequest::get().uri("/?lang=en").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "API is running");
    }

    #[actix_web::test]
    async fn malformed_json_is_a_localized_bad_request() {
        let state = state(MemoryStore::seeded());
        let app = app!(state);
        let req = test::TestRequest::post()
            .uri("/api/orders")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .insert_header(("Accept-Language", "en"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Malformed request");
    }

    #[actix_web::test]
    async fn non_numeric_ids_are_json_not_found() {
        let state = state(MemoryStore::seeded());
        let app = app!(state);

        let cases = [
            (test::TestRequest::put().uri("/api/products/abc").set_json(json!({ "stock": 1 })), "Продукт не найден"),
            (test::TestRequest::delete().uri("/api/products/abc"), "Продукт не найден"),
            (
                test::TestRequest::post().uri("/api/registrations/abc").set_json(json!({ "status": "approved" })),
                "Регистрация не найдена",
            ),
        ];
        for (req, message) in cases {
            let resp = test::call_service(&app, req.to_request()).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND);
            let content_type = resp.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap().to_string();
            assert!(content_type.starts_with("application/json"));
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["success"], false);
            assert_eq!(body["error"], message);
        }

        let req = test::TestRequest::delete().uri("/api/products/abc?lang=en").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["error"], "Product not found");

        let req = test::TestRequest::get().uri("/api/products").to_request();
        let products: Vec<Value> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(products.len(), 2);
    }

    async fn explode() -> HttpResponse {
        HttpResponse::InternalServerError().body("boom")
    }

    #[actix_web::test]
    async fn bare_500s_get_a_json_body() {
        let app = test::init_service(
            App::new()
                .wrap(ErrorHandlers::new().handler(StatusCode::INTERNAL_SERVER_ERROR, internal_error))
                .route("/explode", web::get().to(explode)),
        )
        .await;
        let resp = test::call_service(&app, test::TestRequest::get().uri("/explode").to_request()).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Внутренняя ошибка сервера");
    }
}
