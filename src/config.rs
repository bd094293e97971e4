use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    Sqlite,
}

impl FromStr for StorageKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(StorageKind::Memory),
            "sqlite" => Ok(StorageKind::Sqlite),
            other => Err(ConfigError::Invalid { key: "STORAGE", value: other.to_string() }),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime settings, read from the environment (and `.env`).
#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub storage: StorageKind,
    pub database_url: String,
    pub database_max_connections: u32,
    pub fallback_to_memory: bool,
    pub bot_token: Option<String>,
    pub init_data_max_age: Option<Duration>,
    pub admin_chat_id: Option<i64>,
}

fn parse<T: FromStr>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid { key, value: v }),
    }
}

fn parse_bool(key: &'static str, value: Option<String>) -> Result<bool, ConfigError> {
    match value.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(ConfigError::Invalid { key, value: v.clone() }),
        },
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = lookup("PORT")
            .and_then(|p| p.trim().parse::<u16>().ok())
            .unwrap_or(3000);

        let max_age_secs: u64 = parse("INIT_DATA_MAX_AGE_SECS", lookup("INIT_DATA_MAX_AGE_SECS"), 86_400)?;

        Ok(Config {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            storage: parse("STORAGE", lookup("STORAGE"), StorageKind::Memory)?,
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| "sqlite://orders.db".to_string()),
            database_max_connections: parse("DATABASE_MAX_CONNECTIONS", lookup("DATABASE_MAX_CONNECTIONS"), 5)?,
            fallback_to_memory: parse_bool("STORE_FALLBACK_TO_MEMORY", lookup("STORE_FALLBACK_TO_MEMORY"))?,
            bot_token: lookup("TELEGRAM_BOT_TOKEN").filter(|t| !t.trim().is_empty()),
            init_data_max_age: if max_age_secs == 0 { None } else { Some(Duration::from_secs(max_age_secs)) },
            admin_chat_id: match lookup("TELEGRAM_ADMIN_CHAT_ID") {
                None => None,
                Some(v) => Some(parse("TELEGRAM_ADMIN_CHAT_ID", Some(v), 0i64)?),
            },
        })
    }
}
