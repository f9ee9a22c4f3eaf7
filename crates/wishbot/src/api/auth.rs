use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use wishcore::config;
use wishcore::storage::users::{get_or_create_user, User};
use wishcore::{get_connection, TelegramIdentity};

use super::error::ApiError;
use super::ApiState;

/// The user behind a request, authenticated by its signed initData header
///
/// Verification failures are logged by kind and answered with a uniform 401.
/// A verified user seen for the first time is created on the spot.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<Arc<ApiState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<ApiState>) -> Result<Self, Self::Rejection> {
        let Some(header) = parts.headers.get(config::auth::INIT_DATA_HEADER) else {
            log::warn!("Rejected {} {}: missing initData header", parts.method, parts.uri.path());
            return Err(ApiError::Unauthorized);
        };
        let Ok(init_data) = header.to_str() else {
            log::warn!("Rejected {} {}: initData header is not ASCII", parts.method, parts.uri.path());
            return Err(ApiError::Unauthorized);
        };

        let validated = state.verifier.verify(init_data).map_err(|e| {
            log::warn!("Rejected {} {}: initData {}", parts.method, parts.uri.path(), e.kind());
            ApiError::Unauthorized
        })?;
        let identity = TelegramIdentity::from_init_data(&validated).map_err(|e| {
            log::warn!("Rejected {} {}: {}", parts.method, parts.uri.path(), e);
            ApiError::Unauthorized
        })?;

        let conn = get_connection(&state.db_pool)?;
        let user = get_or_create_user(&conn, &identity)?;
        if !user.is_active {
            log::warn!("Rejected {} {}: user {} is deactivated", parts.method, parts.uri.path(), user.id);
            return Err(ApiError::Unauthorized);
        }

        Ok(CurrentUser(user))
    }
}
