use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::i18n::Locale;
use crate::services::init_data::InitDataError;
use crate::services::orders::PlaceOrderError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("registration for telegram id {0} already exists")]
    DuplicateTelegramId(i64),
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: i64,
        requested: i64,
        available: i64,
    },
    #[error("store lock poisoned")]
    Poisoned,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Failure of a request, rendered as `{success: false, error}` in the caller's locale.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing required fields")]
    MissingFields,
    #[error("malformed request")]
    MalformedRequest,
    #[error("quantity must be a positive integer")]
    InvalidQuantity,
    #[error("stock must be a non-negative integer")]
    InvalidStock,
    #[error("invalid initData: {0}")]
    InvalidInitData(#[from] InitDataError),
    #[error("registration already exists")]
    DuplicateRegistration,
    #[error("insufficient stock or invalid product")]
    InsufficientStock,
    #[error("registration not found")]
    RegistrationNotFound,
    #[error("product not found")]
    ProductNotFound,
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFields
            | ApiError::MalformedRequest
            | ApiError::InvalidQuantity
            | ApiError::InvalidStock
            | ApiError::DuplicateRegistration
            | ApiError::InsufficientStock => StatusCode::BAD_REQUEST,
            ApiError::InvalidInitData(_) => StatusCode::UNAUTHORIZED,
            ApiError::RegistrationNotFound | ApiError::ProductNotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self, locale: Locale) -> &'static str {
        match (self, locale) {
            (ApiError::MissingFields, Locale::Ru) => "Не заполнены обязательные поля",
            (ApiError::MissingFields, Locale::En) => "Required fields are missing",
            (ApiError::MalformedRequest, Locale::Ru) => "Некорректный запрос",
            (ApiError::MalformedRequest, Locale::En) => "Malformed request",
            (ApiError::InvalidQuantity, Locale::Ru) => "Количество должно быть положительным целым числом",
            (ApiError::InvalidQuantity, Locale::En) => "Quantity must be a positive integer",
            (ApiError::InvalidStock, Locale::Ru) => "Остаток должен быть неотрицательным целым числом",
            (ApiError::InvalidStock, Locale::En) => "Stock must be a non-negative integer",
            (ApiError::InvalidInitData(_), Locale::Ru) => "Неверный initData",
            (ApiError::InvalidInitData(_), Locale::En) => "Invalid initData",
            (ApiError::DuplicateRegistration, Locale::Ru) => "Пользователь уже зарегистрирован",
            (ApiError::DuplicateRegistration, Locale::En) => "User is already registered",
            (ApiError::InsufficientStock, Locale::Ru) => "Недостаточно товара или неверный продукт",
            (ApiError::InsufficientStock, Locale::En) => "Insufficient stock or invalid product",
            (ApiError::RegistrationNotFound, Locale::Ru) => "Регистрация не найдена",
            (ApiError::RegistrationNotFound, Locale::En) => "Registration not found",
            (ApiError::ProductNotFound, Locale::Ru) => "Продукт не найден",
            (ApiError::ProductNotFound, Locale::En) => "Product not found",
            (ApiError::Internal(_), Locale::Ru) => "Внутренняя ошибка сервера",
            (ApiError::Internal(_), Locale::En) => "Internal server error",
        }
    }

    pub fn to_response(&self, locale: Locale) -> HttpResponse {
        if let ApiError::Internal(detail) = self {
            error!(detail = %detail, "Request failed with internal error");
        }
        HttpResponse::build(self.status()).json(json!({
            "success": false,
            "error": self.message(locale),
        }))
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity: "registration", .. } => ApiError::RegistrationNotFound,
            StoreError::NotFound { entity: "product", .. } => ApiError::ProductNotFound,
            StoreError::DuplicateTelegramId(_) => ApiError::DuplicateRegistration,
            StoreError::InsufficientStock { .. } => ApiError::InsufficientStock,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<PlaceOrderError> for ApiError {
    fn from(err: PlaceOrderError) -> Self {
        match err {
            PlaceOrderError::InvalidQuantity(_) => ApiError::InvalidQuantity,
            PlaceOrderError::Unavailable { .. } => ApiError::InsufficientStock,
            PlaceOrderError::Store(e) => ApiError::Internal(e.to_string()),
        }
    }
}
