//! HTTP surface: the cron trigger, manual test sends, history and settings.
//!
//! Every response uses the `{ "ok": bool, ... }` envelope. Requests are traced
//! by `TraceLayer`.

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::SqliteStore;
use crate::delivery::BoardSender;
use crate::providers::ProviderRegistry;

pub mod auth;
pub mod error;
pub mod handlers;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SqliteStore>,
    pub providers: Arc<ProviderRegistry>,
    pub sender: Arc<dyn BoardSender>,
    /// `None` while the secret is unset; the job route then answers 503.
    pub cron_secret: Option<String>,
    pub missing_settings: Vec<&'static str>,
}

impl AppState {
    pub fn new(
        cfg: &Config,
        store: Arc<SqliteStore>,
        providers: Arc<ProviderRegistry>,
        sender: Arc<dyn BoardSender>,
    ) -> Self {
        Self {
            store,
            providers,
            sender,
            cron_secret: cfg.cron_secret(),
            missing_settings: cfg.missing_cron_settings(),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(handlers::health))
        .route("/jobs/send-quotes", post(handlers::send_quotes))
        .route("/test-send", post(handlers::test_send))
        .route("/logs", get(handlers::list_logs))
        .route(
            "/settings",
            get(handlers::get_settings).post(handlers::save_settings),
        );

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
