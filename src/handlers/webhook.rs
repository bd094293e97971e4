use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::info;

#[derive(Deserialize)]
pub struct TelegramWebhookUpdate {
    update_id: i64,
    message: Option<TelegramMessage>,
}

#[derive(Deserialize)]
struct TelegramMessage {
    message_id: i64,
    chat: TelegramChat,
    text: Option<String>,
}

#[derive(Deserialize)]
struct TelegramChat {
    id: i64,
}

// Bot conversations are handled elsewhere; this only acknowledges delivery.
pub async fn telegram_update(data: web::Json<TelegramWebhookUpdate>) -> HttpResponse {
    let update = data.into_inner();
    match &update.message {
        Some(msg) => info!(
            update_id = update.update_id,
            chat_id = msg.chat.id,
            message_id = msg.message_id,
            text = msg.text.as_deref().unwrap_or(""),
            "Telegram update received"
        ),
        None => info!(update_id = update.update_id, "Telegram update without message received"),
    }
    HttpResponse::Ok().finish()
}
