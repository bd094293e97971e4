use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::models::{Order, Registration};

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
}

#[derive(Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    result: Option<TelegramMessageResult>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
struct TelegramMessageResult {
    message_id: i64,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("request to Telegram failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("failed to parse Telegram response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Telegram API error: {0}")]
    Api(String),
}

/// Posts admin notices about new registrations and orders to a Telegram chat.
pub struct TelegramNotifier {
    client: Client,
    admin_chat_id: i64,
    api_url: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, admin_chat_id: i64) -> Self {
        TelegramNotifier {
            client: Client::new(),
            admin_chat_id,
            api_url: format!("https://api.telegram.org/bot{}", bot_token),
        }
    }

    /// `None` unless both the bot token and the admin chat are configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        let token = config.bot_token.as_deref()?;
        let chat_id = config.admin_chat_id?;
        Some(Self::new(token, chat_id))
    }

    pub async fn send_message(&self, text: &str) -> Result<i64, NotifyError> {
        let request = SendMessageRequest {
            chat_id: self.admin_chat_id,
            text,
            parse_mode: Some("HTML"),
        };

        let url = format!("{}/sendMessage", self.api_url);
        let response_text = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?
            .text()
            .await?;

        let response: TelegramResponse = serde_json::from_str(&response_text)?;

        if response.ok {
            match response.result {
                Some(msg) => Ok(msg.message_id),
                None => Err(NotifyError::Api("no message id in response".to_string())),
            }
        } else {
            Err(NotifyError::Api(response.description.unwrap_or_default()))
        }
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub fn registration_notice(r: &Registration) -> String {
    let mut text = format!(
        "📝 <b>Новая заявка на регистрацию #{}</b>\n\n👤 {}\n🆔 {}",
        r.id,
        escape_html(&r.name),
        r.telegram_id
    );
    if let Some(company) = &r.company_name {
        text.push_str(&format!("\n🏢 {}", escape_html(company)));
    }
    if let Some(email) = &r.email {
        text.push_str(&format!("\n✉️ {}", escape_html(email)));
    }
    if let Some(phone) = &r.phone {
        text.push_str(&format!("\n📞 {}", escape_html(phone)));
    }
    text
}

pub fn order_notice(o: &Order) -> String {
    format!(
        "📦 <b>Новый заказ #{}</b>\n\n🆔 {}\nТовар: #{}\nКоличество: {}",
        o.id, o.telegram_id, o.product_id, o.quantity
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_notice_lists_known_contacts() {
        let r = Registration {
            id: 3,
            telegram_id: 555,
            name: "Anna <CEO>".to_string(),
            email: None,
            company_name: Some("Tom & Jerry".to_string()),
            phone: Some("+7 900 000-00-00".to_string()),
            status: "pending".to_string(),
            created_at: String::new(),
        };
        let text = registration_notice(&r);
        assert!(text.contains("#3"));
        assert!(text.contains("Anna &lt;CEO&gt;"));
        assert!(text.contains("Tom &amp; Jerry"));
        assert!(text.contains("+7 900 000-00-00"));
        assert!(!text.contains("✉️"));
    }

    #[test]
    fn telegram_error_response_is_reported() {
        let response: TelegramResponse =
            serde_json::from_str(r#"{"ok": false, "description": "Bad Request: chat not found"}"#).unwrap();
        assert!(!response.ok);
        assert_eq!(response.description.as_deref(), Some("Bad Request: chat not found"));
    }
}
