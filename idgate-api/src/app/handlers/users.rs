//! 用户管理 API handlers（仅管理员可访问）

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use idgate_core::{CreateUserRequest, ListUsersParams, UserSummary, UserUpdate};
use serde::Serialize;

use super::super::error::ApiError;
use super::super::extract::{AppJson, AppPath, AppQuery};
use super::super::middleware::RequireAdmin;
use super::super::state::AppState;

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<UserSummary>,
    pub count: u64,
}

/// GET /users?page=&limit=&search= - 分页列出用户
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    AppQuery(params): AppQuery<ListUsersParams>,
) -> Result<Json<UserListResponse>, ApiError> {
    let page = state.auth.list_users(params).await?;
    Ok(Json(UserListResponse {
        users: page.users.into_iter().map(UserSummary::from).collect(),
        count: page.count,
    }))
}

/// POST /users - 直接创建用户（不经过邮箱验证）
pub async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    AppJson(req): AppJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserSummary>), ApiError> {
    let user = state.auth.create_user(req).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// GET /users/:id - 获取用户详情
pub async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    AppPath(id): AppPath<i64>,
) -> Result<Json<UserSummary>, ApiError> {
    let user = state.auth.get_user(id).await?;
    Ok(Json(user.into()))
}

/// PUT /users/:id - 更新用户资料
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    AppPath(id): AppPath<i64>,
    AppJson(update): AppJson<UserUpdate>,
) -> Result<Json<UserSummary>, ApiError> {
    let user = state.auth.update_user(id, update).await?;
    Ok(Json(user.into()))
}

/// DELETE /users/:id - 删除用户
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    AppPath(id): AppPath<i64>,
) -> Result<StatusCode, ApiError> {
    if admin.claims.user_id == id {
        return Err(ApiError::forbidden("cannot delete your own account"));
    }
    state.auth.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
