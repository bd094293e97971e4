mod config;
mod db;
mod error;
mod handlers;
mod i18n;
mod models;
mod services;
mod state;
mod store;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::http::StatusCode;
use actix_web::middleware::{ErrorHandlers, Logger, NormalizePath};
use actix_web::{web, App, HttpServer};
use tracing::{error, info, warn};

use config::Config;
use services::init_data::{AcceptAllVerifier, InitDataVerifier, TelegramInitDataVerifier};
use services::telegram::TelegramNotifier;
use state::AppState;

fn setup_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .compact()
        .init();
}

fn init_data_verifier(config: &Config) -> std::io::Result<Arc<dyn InitDataVerifier>> {
    match config.bot_token.as_deref() {
        Some(token) => {
            let verifier = TelegramInitDataVerifier::new(token, config.init_data_max_age)
                .map_err(std::io::Error::other)?;
            Ok(Arc::new(verifier))
        }
        None => {
            warn!("TELEGRAM_BOT_TOKEN is not set, initData is NOT verified");
            Ok(Arc::new(AcceptAllVerifier))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    setup_tracing();

    let config = Config::from_env().map_err(|e| {
        error!(error = %e, "Invalid configuration");
        std::io::Error::other(e)
    })?;

    let store = store::open(&config).await.map_err(|e| {
        error!(error = %e, "Failed to open record store");
        std::io::Error::other(e)
    })?;
    let verifier = init_data_verifier(&config)?;
    let notifier = TelegramNotifier::from_config(&config).map(Arc::new);
    if notifier.is_none() {
        info!("Admin notifications disabled");
    }

    info!(host = %config.host, port = config.port, storage = store.backend(), "Server starting");
    let app_state = web::Data::new(AppState::new(store, verifier, notifier));

    HttpServer::new(move || {
        App::new()
            .wrap(ErrorHandlers::new().handler(StatusCode::INTERNAL_SERVER_ERROR, handlers::internal_error))
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .wrap(Cors::permissive())
            .app_data(app_state.clone())
            .configure(handlers::configure)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
