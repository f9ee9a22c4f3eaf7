use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use wishcore::config;
use wishcore::get_connection;
use wishcore::storage::wishes::{self, NewWish, Wish, WishFilter, WishPage, WishStatus, WishUpdate};

use super::auth::CurrentUser;
use super::error::{ApiError, ApiResult};
use super::patch::WishPatch;
use super::ApiState;

const WISH_NOT_FOUND: &str = "Wish not found";

/// Query string of GET /api/wishes
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub status: Option<WishStatus>,
    pub category_id: Option<i64>,
    pub search: Option<String>,
}

impl From<ListParams> for WishFilter {
    fn from(params: ListParams) -> Self {
        WishFilter {
            status: params.status.unwrap_or_default(),
            category_id: params.category_id,
            search: params.search,
            page: params.page.unwrap_or(1),
            page_size: params.page_size.unwrap_or(config::pagination::DEFAULT_PAGE_SIZE),
        }
    }
}

/// GET /api/wishes
pub async fn list_wishes(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<WishPage>> {
    let Query(params) = params?;
    let conn = get_connection(&state.db_pool)?;
    let page = wishes::list_wishes(&conn, user.id, &params.into())?;
    Ok(Json(page))
}

/// POST /api/wishes
pub async fn create_wish(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<NewWish>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Wish>)> {
    let Json(new_wish) = payload?;
    let new_wish = new_wish.validate()?;

    let conn = get_connection(&state.db_pool)?;
    let wish = wishes::create_wish(&conn, user.id, &new_wish)?;
    Ok((StatusCode::CREATED, Json(wish)))
}

/// GET /api/wishes/{id}
pub async fn get_wish(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    wish_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Wish>> {
    let Path(wish_id) = wish_id?;
    let conn = get_connection(&state.db_pool)?;
    let wish = wishes::get_wish_for_owner(&conn, wish_id, user.id)?.ok_or_else(|| ApiError::not_found(WISH_NOT_FOUND))?;
    Ok(Json(wish))
}

/// PUT /api/wishes/{id}
pub async fn update_wish(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    wish_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<WishPatch>, JsonRejection>,
) -> ApiResult<Json<Wish>> {
    let Path(wish_id) = wish_id?;
    let Json(patch) = payload?;
    let update = WishUpdate::from(patch).validate()?;

    let conn = get_connection(&state.db_pool)?;
    let wish = wishes::update_wish(&conn, wish_id, user.id, &update)?.ok_or_else(|| ApiError::not_found(WISH_NOT_FOUND))?;
    Ok(Json(wish))
}

/// DELETE /api/wishes/{id}
pub async fn delete_wish(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    wish_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(wish_id) = wish_id?;
    let conn = get_connection(&state.db_pool)?;
    if !wishes::delete_wish(&conn, wish_id, user.id)? {
        return Err(ApiError::not_found(WISH_NOT_FOUND));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/wishes/{id}/complete
pub async fn complete_wish(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    wish_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Wish>> {
    let Path(wish_id) = wish_id?;
    let conn = get_connection(&state.db_pool)?;
    let wish = wishes::complete_wish(&conn, wish_id, user.id)?.ok_or_else(|| ApiError::not_found(WISH_NOT_FOUND))?;
    log::info!("User {} completed wish {}", user.id, wish.id);
    Ok(Json(wish))
}
