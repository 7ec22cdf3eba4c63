//! Shared-secret check for the cron job route.
//!
//! The caller sends the secret in the `x-cron-secret` header. When the server
//! has no secret configured the route reports that setup is required instead
//! of accepting anything.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::error::AppError;
use super::AppState;

pub const CRON_SECRET_HEADER: &str = "x-cron-secret";

/// Extracting this validates the cron secret.
pub struct CronAuthorized;

impl FromRequestParts<AppState> for CronAuthorized {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.cron_secret.as_deref() else {
            return Err(AppError::SetupRequired {
                missing: state.missing_settings.clone(),
            });
        };

        let provided = parts
            .headers
            .get(CRON_SECRET_HEADER)
            .and_then(|v| v.to_str().ok());

        match provided {
            Some(value) if value == expected => Ok(CronAuthorized),
            _ => Err(AppError::Unauthorized),
        }
    }
}
