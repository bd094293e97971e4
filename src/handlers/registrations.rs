use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use tracing::info;

use crate::error::ApiError;
use crate::i18n;
use crate::models::{RegisterRequest, RegistrationQuery, StatusUpdateRequest};
use crate::services::telegram;
use crate::state::AppState;

pub async fn register(
    req: HttpRequest,
    data: web::Json<RegisterRequest>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let locale = i18n::detect_locale(&req);
    let register_req = data.into_inner();

    if let Err(e) = state.authorize(register_req.init_data.as_deref(), register_req.telegram_id) {
        return e.to_response(locale);
    }

    let new_registration = match register_req.into_new() {
        Some(new) => new,
        None => return ApiError::MissingFields.to_response(locale),
    };

    match state.store.insert_registration(new_registration).await {
        Ok(registration) => {
            info!(registration_id = registration.id, telegram_id = registration.telegram_id, "Registration received");
            state.notify_admins(telegram::registration_notice(&registration));
            HttpResponse::Ok().json(json!({
                "success": true,
                "registration": registration
            }))
        }
        Err(e) => ApiError::from(e).to_response(locale),
    }
}

/// Pending registrations for the admin panel, or one user's registration when
/// `telegramId` is given.
pub async fn list_or_lookup(
    req: HttpRequest,
    query: web::Query<RegistrationQuery>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let locale = i18n::detect_locale(&req);

    match query.telegram_id {
        Some(telegram_id) => match state.store.registration_by_telegram_id(telegram_id).await {
            Ok(Some(registration)) => HttpResponse::Ok().json(registration),
            Ok(None) => HttpResponse::Ok().json(json!({ "status": "not_found" })),
            Err(e) => ApiError::from(e).to_response(locale),
        },
        None => match state.store.pending_registrations().await {
            Ok(pending) => HttpResponse::Ok().json(pending),
            Err(e) => ApiError::from(e).to_response(locale),
        },
    }
}

pub async fn update_status(
    req: HttpRequest,
    path: web::Path<i64>,
    data: web::Json<StatusUpdateRequest>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let locale = i18n::detect_locale(&req);
    let id = path.into_inner();

    let status = match data.into_inner().status {
        Some(status) => status,
        None => return ApiError::MissingFields.to_response(locale),
    };

    match state.store.set_registration_status(id, &status).await {
        Ok(()) => {
            info!(registration_id = id, status = %status, "Registration status updated");
            HttpResponse::Ok().json(json!({ "success": true }))
        }
        Err(e) => ApiError::from(e).to_response(locale),
    }
}
