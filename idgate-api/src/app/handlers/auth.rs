//! 认证相关 API handlers：注册、验证、登录、token 权限校验

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use idgate_core::{
    AuthSession, LoginRequest, RegisterRequest, TokenCheck, UserType, VerifyRequest,
    VerifyTokenRequest,
};
use serde::Serialize;

use super::super::error::ApiError;
use super::super::extract::AppJson;
use super::super::middleware::ClientIp;
use super::super::state::AppState;

/// POST /auth/register - 暂存注册信息，验证码异步发送
pub async fn register(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    AppJson(req): AppJson<RegisterRequest>,
) -> Result<StatusCode, ApiError> {
    if !state.register_limiter.allow(&ip).await {
        return Err(ApiError::too_many_requests(
            "too many registration attempts, try again later",
        ));
    }
    state.auth.register(req).await?;
    Ok(StatusCode::ACCEPTED)
}

/// POST /auth/verify - 提交验证码，成功后返回用户与 token
pub async fn verify(
    State(state): State<AppState>,
    AppJson(req): AppJson<VerifyRequest>,
) -> Result<Json<AuthSession>, ApiError> {
    let session = state.auth.verify(req).await?;
    Ok(Json(session))
}

/// POST /auth/login - 用户登录
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<AuthSession>, ApiError> {
    if !state.login_limiter.allow(&ip).await {
        return Err(ApiError::too_many_requests(
            "too many login attempts, try again later",
        ));
    }
    let session = state.auth.login(req).await?;
    Ok(Json(session))
}

#[derive(Debug, Serialize)]
pub struct VerifyTokenResponse {
    pub token_id: String,
    pub user_id: i64,
    pub email: String,
    pub user_type: UserType,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub has_permission: bool,
}

impl From<TokenCheck> for VerifyTokenResponse {
    fn from(check: TokenCheck) -> Self {
        Self {
            issued_at: check.claims.issued_at(),
            expires_at: check.claims.expires_at(),
            token_id: check.claims.jti,
            user_id: check.claims.user_id,
            email: check.claims.email,
            user_type: check.claims.user_type,
            has_permission: check.has_permission,
        }
    }
}

/// POST /auth/verify-token - 校验 token 并查询权限；无权限仍返回 200
pub async fn verify_token(
    State(state): State<AppState>,
    AppJson(req): AppJson<VerifyTokenRequest>,
) -> Result<Json<VerifyTokenResponse>, ApiError> {
    let check = state.auth.verify_token(req).await?;
    Ok(Json(check.into()))
}
