use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use wishcore::get_connection;
use wishcore::storage::groups::{
    self, Group, GroupMember, GroupUpdate, GroupWish, GroupWithMembers, MemberWithUser, NewGroup,
};
use wishcore::storage::DbConnection;

use super::auth::CurrentUser;
use super::error::{ApiError, ApiResult};
use super::patch::GroupPatch;
use super::ApiState;

const NOT_A_MEMBER: &str = "Not a member of this group";

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub invite_code: String,
}

/// Fails with 403 unless the user belongs to the group
fn require_member(conn: &DbConnection, group_id: i64, user_id: i64) -> ApiResult<GroupMember> {
    groups::get_membership(conn, group_id, user_id)?.ok_or_else(|| ApiError::Forbidden(NOT_A_MEMBER.to_string()))
}

/// GET /api/groups
pub async fn list_groups(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<Vec<GroupWithMembers>>> {
    let conn = get_connection(&state.db_pool)?;
    Ok(Json(groups::list_user_groups(&conn, user.id)?))
}

/// POST /api/groups
pub async fn create_group(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<NewGroup>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Group>)> {
    let Json(new_group) = payload?;
    let new_group = new_group.validate()?;

    let conn = get_connection(&state.db_pool)?;
    let group = groups::create_group(&conn, user.id, &new_group)?;
    Ok((StatusCode::CREATED, Json(group)))
}

/// GET /api/groups/{id}
pub async fn get_group(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    group_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Group>> {
    let Path(group_id) = group_id?;
    let conn = get_connection(&state.db_pool)?;
    require_member(&conn, group_id, user.id)?;
    let group = groups::get_group(&conn, group_id)?.ok_or_else(|| ApiError::not_found("Group not found"))?;
    Ok(Json(group))
}

/// PUT /api/groups/{id}
pub async fn update_group(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    group_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<GroupPatch>, JsonRejection>,
) -> ApiResult<Json<Group>> {
    let Path(group_id) = group_id?;
    let Json(patch) = payload?;

    let conn = get_connection(&state.db_pool)?;
    let allowed = groups::get_membership(&conn, group_id, user.id)?
        .map(|m| m.role.can_manage())
        .unwrap_or(false);
    if !allowed {
        return Err(ApiError::Forbidden("Not authorized to update this group".to_string()));
    }

    let update = GroupUpdate::from(patch).validate()?;
    let group = groups::update_group(&conn, group_id, &update)?.ok_or_else(|| ApiError::not_found("Group not found"))?;
    log::info!("User {} updated group {}", user.id, group_id);
    Ok(Json(group))
}

/// POST /api/groups/{id}/join
pub async fn join_group(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    group_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<JoinRequest>, JsonRejection>,
) -> ApiResult<Json<GroupMember>> {
    let Path(group_id) = group_id?;
    let Json(request) = payload?;

    let conn = get_connection(&state.db_pool)?;
    let membership = groups::join_group(&conn, group_id, user.id, request.invite_code.trim())?;
    Ok(Json(membership))
}

/// GET /api/groups/{id}/members
pub async fn list_members(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    group_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Vec<MemberWithUser>>> {
    let Path(group_id) = group_id?;
    let conn = get_connection(&state.db_pool)?;
    require_member(&conn, group_id, user.id)?;
    Ok(Json(groups::list_members(&conn, group_id)?))
}

/// GET /api/groups/{id}/wishes
pub async fn list_group_wishes(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    group_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Vec<GroupWish>>> {
    let Path(group_id) = group_id?;
    let conn = get_connection(&state.db_pool)?;
    require_member(&conn, group_id, user.id)?;
    Ok(Json(groups::list_group_wishes(&conn, group_id, user.id)?))
}
