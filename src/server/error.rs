//! Maps domain failures onto HTTP statuses and the `{ok: false, ...}` envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::scheduler::TestSendError;
use crate::settings::SettingsError;

#[derive(Debug)]
pub enum AppError {
    /// The cron secret is not configured; `missing` names the settings to fill in.
    SetupRequired { missing: Vec<&'static str> },
    Unauthorized,
    NotFound(String),
    BadRequest(String),
    Validation { message: String, issues: Vec<String> },
    Internal(String),
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(format!("{err:#}"))
    }
}

impl From<TestSendError> for AppError {
    fn from(err: TestSendError) -> Self {
        match err {
            TestSendError::NoActiveBoard | TestSendError::BoardUnavailable => {
                AppError::NotFound(err.to_string())
            }
            TestSendError::Delivery(_) => AppError::Internal(err.to_string()),
            TestSendError::Store(e) => e.into(),
        }
    }
}

impl From<SettingsError> for AppError {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::Validation(v) => AppError::Validation {
                message: v.to_string(),
                issues: v.issues,
            },
            SettingsError::MissingApiKey => AppError::BadRequest(err.to_string()),
            SettingsError::Store(e) => e.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::SetupRequired { missing } => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({
                    "ok": false,
                    "setupRequired": true,
                    "error": "Cron secret is not configured.",
                    "missing": missing,
                }),
            ),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "ok": false, "error": "Unauthorized" }),
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                json!({ "ok": false, "error": msg }),
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "ok": false, "error": msg }),
            ),
            AppError::Validation { message, issues } => (
                StatusCode::BAD_REQUEST,
                json!({ "ok": false, "error": message, "issues": issues }),
            ),
            AppError::Internal(msg) => {
                error!(error = %msg, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "ok": false, "error": msg }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}
