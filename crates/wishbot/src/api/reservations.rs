use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use wishcore::get_connection;
use wishcore::storage::reservations::{self, NewReservation, Reservation, ReservationWithDetails};

use super::auth::CurrentUser;
use super::error::{ApiError, ApiResult};
use super::ApiState;

/// GET /api/reservations
pub async fn list_reservations(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<ReservationWithDetails>>> {
    let conn = get_connection(&state.db_pool)?;
    Ok(Json(reservations::list_user_reservations(&conn, user.id)?))
}

/// POST /api/reservations
pub async fn create_reservation(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<NewReservation>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Reservation>)> {
    let Json(request) = payload?;
    let conn = get_connection(&state.db_pool)?;
    let reservation = reservations::create_reservation(&conn, user.id, &request)?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// DELETE /api/reservations/{id}
pub async fn delete_reservation(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    reservation_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(reservation_id) = reservation_id?;
    let conn = get_connection(&state.db_pool)?;
    if !reservations::delete_reservation(&conn, reservation_id, user.id)? {
        return Err(ApiError::not_found("Reservation not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
