use serde::{Deserialize, Serialize};

use super::lenient;

pub const STATUS_PENDING: &str = "pending";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub id: i64,
    pub telegram_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub company_name: Option<String>,
    pub phone: Option<String>,
    pub status: String, // free-form: "pending" | "approved" | "rejected" | anything an admin sets
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub telegram_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub company_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub telegram_id: Option<i64>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub company_name: Option<String>,
    pub phone: Option<String>,
    pub init_data: Option<String>,
}

impl RegisterRequest {
    /// The record to store, or `None` when a required field is absent.
    pub fn into_new(self) -> Option<NewRegistration> {
        Some(NewRegistration {
            telegram_id: self.telegram_id?,
            name: non_empty(self.name)?,
            email: non_empty(self.email),
            company_name: non_empty(self.company_name),
            phone: non_empty(self.phone),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationQuery {
    #[serde(default, deserialize_with = "lenient::opt_i64")]
    pub telegram_id: Option<i64>,
}

// Normalize empty strings to None
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|s| if s.trim().is_empty() { None } else { Some(s) })
}
