use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use wishcore::get_connection;
use wishcore::storage::users::{self, User, UserStats, UserUpdate};
use wishcore::storage::wishes::{self, Wish};

use super::auth::CurrentUser;
use super::error::{ApiError, ApiResult};
use super::patch::UserPatch;
use super::ApiState;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub user: User,
    #[serde(flatten)]
    pub stats: UserStats,
}

/// What other users may see of someone
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: String,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub birthday: Option<String>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser {
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            avatar_url: user.avatar_url,
            birthday: user.birthday,
        }
    }
}

/// GET /api/user/profile
pub async fn get_profile(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<ProfileResponse>> {
    let conn = get_connection(&state.db_pool)?;
    let stats = users::get_user_stats(&conn, user.id)?;
    Ok(Json(ProfileResponse { user, stats }))
}

/// PUT /api/user/profile
pub async fn update_profile(
    State(state): State<Arc<ApiState>>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<UserPatch>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let Json(patch) = payload?;
    let update = UserUpdate::from(patch).validate()?;

    let conn = get_connection(&state.db_pool)?;
    let updated = users::update_user_profile(&conn, user.id, &update)?.ok_or_else(|| ApiError::not_found("User not found"))?;
    log::info!("User {} updated their profile", user.id);
    Ok(Json(updated))
}

/// GET /api/user/{id}
pub async fn get_public_user(
    State(state): State<Arc<ApiState>>,
    _viewer: CurrentUser,
    user_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<PublicUser>> {
    let Path(user_id) = user_id?;
    let conn = get_connection(&state.db_pool)?;
    let user = users::get_user_by_id(&conn, user_id)?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    Ok(Json(user.into()))
}

/// GET /api/user/{id}/wishes
pub async fn get_public_wishes(
    State(state): State<Arc<ApiState>>,
    CurrentUser(viewer): CurrentUser,
    user_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Vec<Wish>>> {
    let Path(user_id) = user_id?;
    let conn = get_connection(&state.db_pool)?;
    let mut wishes = wishes::list_public_wishes(&conn, user_id)?;
    if user_id != viewer.id {
        for wish in &mut wishes {
            wish.notes = None;
        }
    }
    Ok(Json(wishes))
}
