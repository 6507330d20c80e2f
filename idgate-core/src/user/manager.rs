//! 认证服务：核心结构、依赖注入和用户管理操作

use super::crypto::hash_password;
use super::models::*;
use super::token::TokenIssuer;
use crate::cache::{CacheError, EphemeralCache};
use crate::config::AuthConfig;
use crate::error::{IdentityError, Result};
use crate::notify::Notifier;
use crate::store::{PermissionStore, StoreError, UserStore};
use std::sync::Arc;
use tracing::{error, info, instrument};

const MAX_PAGE_LIMIT: u32 = 100;

/// 认证服务：注册 -> 验证 -> 落库 -> 签发 token，以及登录与权限校验。
///
/// 所有依赖都以 trait 对象注入，可安全地在多个请求间并发共享。
#[derive(Clone)]
pub struct AuthService {
    pub(super) users: Arc<dyn UserStore>,
    pub(super) permissions: Arc<dyn PermissionStore>,
    pub(super) cache: Arc<dyn EphemeralCache>,
    pub(super) notifier: Arc<dyn Notifier>,
    pub(super) tokens: TokenIssuer,
    pub(super) config: Arc<AuthConfig>,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// 构造器
// ============================================================================

impl AuthService {
    /// 创建认证服务
    pub fn new(
        config: &AuthConfig,
        users: Arc<dyn UserStore>,
        permissions: Arc<dyn PermissionStore>,
        cache: Arc<dyn EphemeralCache>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            users,
            permissions,
            cache,
            notifier,
            tokens: TokenIssuer::new(config),
            config: Arc::new(config.clone()),
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }
}

// ============================================================================
// 内部辅助方法
// ============================================================================

/// 存储层错误转换；后端细节只写日志
pub(super) fn store_error(err: StoreError, what: &str) -> IdentityError {
    match err {
        StoreError::NotFound => IdentityError::NotFound(what.to_string()),
        StoreError::AlreadyExists(detail) => IdentityError::Conflict(detail),
        StoreError::Backend(detail) => {
            error!(error = %detail, "store backend failure");
            IdentityError::Internal("store failure".into())
        }
    }
}

pub(super) fn cache_error(err: CacheError) -> IdentityError {
    error!(error = %err, "cache failure");
    IdentityError::Internal("cache failure".into())
}

// ============================================================================
// 用户 CRUD 操作
// ============================================================================

impl AuthService {
    /// 管理员直接创建用户（不经过邮箱验证）
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn create_user(&self, req: CreateUserRequest) -> Result<User> {
        Self::validate_name("first_name", &req.first_name)?;
        Self::validate_name("last_name", &req.last_name)?;
        Self::validate_email(&req.email)?;
        Self::validate_password_strength(&req.password)?;

        let password_hash = hash_password(&req.password, self.config.bcrypt_cost).await?;
        let new_user = NewUser {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            phone_number: req.phone_number,
            gender: req.gender,
            username: req.username,
            profile_image_url: req.profile_image_url,
            password_hash,
            user_type: req.user_type,
        };

        let user = self
            .users
            .create(new_user)
            .await
            .map_err(|e| store_error(e, "user"))?;
        info!(user_id = %user.id, "created user");
        Ok(user)
    }

    /// 获取用户
    #[instrument(skip(self))]
    pub async fn get_user(&self, id: i64) -> Result<User> {
        self.users
            .get(id)
            .await
            .map_err(|e| store_error(e, &format!("user: {id}")))
    }

    /// 通过邮箱获取用户
    #[instrument(skip(self))]
    pub async fn get_user_by_email(&self, email: &str) -> Result<User> {
        self.users
            .get_by_email(email)
            .await
            .map_err(|e| store_error(e, &format!("user: {email}")))
    }

    /// 分页列出用户
    #[instrument(skip(self))]
    pub async fn list_users(&self, params: ListUsersParams) -> Result<UserPage> {
        if params.page < 1 {
            return Err(IdentityError::Validation("page must be >= 1".into()));
        }
        if params.limit < 1 || params.limit > MAX_PAGE_LIMIT {
            return Err(IdentityError::Validation(format!(
                "limit must be between 1 and {MAX_PAGE_LIMIT}"
            )));
        }
        self.users
            .list(&params)
            .await
            .map_err(|e| store_error(e, "users"))
    }

    /// 更新用户资料
    #[instrument(skip(self, update))]
    pub async fn update_user(&self, id: i64, mut update: UserUpdate) -> Result<User> {
        if let Some(first_name) = &update.first_name {
            Self::validate_name("first_name", first_name)?;
        }
        if let Some(last_name) = &update.last_name {
            Self::validate_name("last_name", last_name)?;
        }
        update.id = id;
        let user = self
            .users
            .update(update)
            .await
            .map_err(|e| store_error(e, &format!("user: {id}")))?;
        info!(user_id = %id, "updated user");
        Ok(user)
    }

    /// 删除用户
    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: i64) -> Result<()> {
        self.users
            .delete(id)
            .await
            .map_err(|e| store_error(e, &format!("user: {id}")))?;
        info!(user_id = %id, "deleted user");
        Ok(())
    }
}
