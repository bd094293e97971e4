use std::sync::Arc;

use tracing::warn;

use crate::error::ApiError;
use crate::services::init_data::InitDataVerifier;
use crate::services::telegram::TelegramNotifier;
use crate::store::RecordStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub verifier: Arc<dyn InitDataVerifier>,
    pub notifier: Option<Arc<TelegramNotifier>>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn RecordStore>,
        verifier: Arc<dyn InitDataVerifier>,
        notifier: Option<Arc<TelegramNotifier>>,
    ) -> Self {
        Self { store, verifier, notifier }
    }

    /// Checks the Mini-App signature and, when the request names a user, that
    /// the signature was issued to that user.
    pub fn authorize(&self, init_data: Option<&str>, telegram_id: Option<i64>) -> Result<(), ApiError> {
        let verified = self.verifier.verify(init_data)?;
        if let Some(telegram_id) = telegram_id {
            verified.ensure_user(telegram_id)?;
        }
        Ok(())
    }

    /// Sends `text` to the admin chat in the background; failures are only logged.
    pub fn notify_admins(&self, text: String) {
        let Some(notifier) = self.notifier.clone() else {
            return;
        };
        actix_web::rt::spawn(async move {
            if let Err(e) = notifier.send_message(&text).await {
                warn!(error = %e, "Failed to notify admin chat");
            }
        });
    }
}
