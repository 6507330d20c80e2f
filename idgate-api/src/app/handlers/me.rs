//! 当前登录用户

use axum::extract::State;
use axum::Json;
use idgate_core::UserSummary;
use serde::Deserialize;

use super::super::error::ApiError;
use super::super::extract::AppJson;
use super::super::middleware::AuthInfo;
use super::super::state::AppState;

/// GET /me - 当前用户资料
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthInfo,
) -> Result<Json<UserSummary>, ApiError> {
    let user = state.auth.get_user(auth.claims.user_id).await?;
    Ok(Json(user.into()))
}

/// 修改密码请求
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// POST /me/password - 修改自己的密码（需要旧密码）
pub async fn change_my_password(
    State(state): State<AppState>,
    auth: AuthInfo,
    AppJson(req): AppJson<ChangePasswordRequest>,
) -> Result<Json<UserSummary>, ApiError> {
    let user = state
        .auth
        .change_password(
            auth.claims.user_id,
            Some(&req.current_password),
            &req.new_password,
            false,
        )
        .await?;
    Ok(Json(user.into()))
}
