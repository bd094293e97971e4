//! Verification of the `initData` string a Telegram Mini-App sends with each request.
//!
//! Telegram signs the launch parameters with a key derived from the bot token:
//! `secret = HMAC_SHA256(key = "WebAppData", msg = bot_token)`, and
//! `hash = hex(HMAC_SHA256(key = secret, msg = data_check_string))`, where the
//! data-check string is every `key=value` pair except `hash`, sorted by key and
//! joined with `\n`.

use std::time::Duration;

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum InitDataError {
    #[error("initData is missing")]
    Missing,
    #[error("initData is not a valid query string")]
    Malformed,
    #[error("initData carries no hash")]
    MissingHash,
    #[error("initData signature does not match")]
    BadSignature,
    #[error("initData auth_date is missing or invalid")]
    MissingAuthDate,
    #[error("initData is {age_secs}s old")]
    Expired { age_secs: i64 },
    #[error("initData belongs to telegram user {signed}, request names {claimed}")]
    UserMismatch { signed: i64, claimed: i64 },
}

/// What a successful check proves about the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifiedInitData {
    /// Telegram user id from the signed `user` field, when present.
    pub user_id: Option<i64>,
}

impl VerifiedInitData {
    /// Rejects a request whose body names a different telegram user than the signed data.
    pub fn ensure_user(&self, claimed: i64) -> Result<(), InitDataError> {
        match self.user_id {
            Some(signed) if signed != claimed => Err(InitDataError::UserMismatch { signed, claimed }),
            _ => Ok(()),
        }
    }
}

pub trait InitDataVerifier: Send + Sync {
    fn verify(&self, init_data: Option<&str>) -> Result<VerifiedInitData, InitDataError>;
}

/// Lets every request through. Used when no bot token is configured.
pub struct AcceptAllVerifier;

impl InitDataVerifier for AcceptAllVerifier {
    fn verify(&self, _init_data: Option<&str>) -> Result<VerifiedInitData, InitDataError> {
        Ok(VerifiedInitData::default())
    }
}

pub struct TelegramInitDataVerifier {
    secret_key: Vec<u8>,
    max_age: Option<Duration>,
}

#[derive(Deserialize)]
struct InitDataUser {
    id: i64,
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<HmacSha256, InitDataError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| InitDataError::Malformed)?;
    mac.update(message);
    Ok(mac)
}

fn data_check_string(fields: &mut [(String, String)]) -> String {
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    fields
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("\n")
}

impl TelegramInitDataVerifier {
    pub fn new(bot_token: &str, max_age: Option<Duration>) -> Result<Self, InitDataError> {
        let secret_key = hmac_sha256(b"WebAppData", bot_token.as_bytes())?
            .finalize()
            .into_bytes()
            .to_vec();
        Ok(Self { secret_key, max_age })
    }

    fn check_age(&self, fields: &[(String, String)]) -> Result<(), InitDataError> {
        let Some(max_age) = self.max_age else {
            return Ok(());
        };
        let auth_date = fields
            .iter()
            .find(|(k, _)| k == "auth_date")
            .and_then(|(_, v)| v.parse::<i64>().ok())
            .ok_or(InitDataError::MissingAuthDate)?;
        let age_secs = chrono::Utc::now().timestamp() - auth_date;
        if age_secs > max_age.as_secs() as i64 {
            return Err(InitDataError::Expired { age_secs });
        }
        Ok(())
    }
}

impl InitDataVerifier for TelegramInitDataVerifier {
    fn verify(&self, init_data: Option<&str>) -> Result<VerifiedInitData, InitDataError> {
        let raw = init_data.map(str::trim).filter(|s| !s.is_empty()).ok_or(InitDataError::Missing)?;
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw).map_err(|_| InitDataError::Malformed)?;

        let mut hash = None;
        let mut fields = Vec::with_capacity(pairs.len());
        for (k, v) in pairs {
            if k == "hash" {
                hash = Some(v);
            } else {
                fields.push((k, v));
            }
        }
        let hash = hash.ok_or(InitDataError::MissingHash)?;
        let expected = hex::decode(hash.trim()).map_err(|_| InitDataError::BadSignature)?;

        let check = data_check_string(&mut fields);
        hmac_sha256(&self.secret_key, check.as_bytes())?
            .verify_slice(&expected)
            .map_err(|_| InitDataError::BadSignature)?;

        self.check_age(&fields)?;

        let user_id = fields
            .iter()
            .find(|(k, _)| k == "user")
            .and_then(|(_, v)| serde_json::from_str::<InitDataUser>(v).ok())
            .map(|u| u.id);
        Ok(VerifiedInitData { user_id })
    }
}
