//! 注册验证流程、登录、token 权限校验
//!
//! 注册状态：NONE -> PENDING（仅存在于缓存）-> VERIFIED（落库并签发 token）；
//! PENDING 在 TTL 到期后隐式失效。

use super::crypto::{check_password, codes_match, generate_random_code, hash_password};
use super::manager::{cache_error, store_error};
use super::models::*;
use super::token::{IssuedToken, TokenClaims};
use super::AuthService;
use crate::cache::{code_key, pending_user_key, CodePurpose};
use crate::error::{IdentityError, Result};
use crate::notify::SendEmailRequest;
use tracing::{error, info, instrument, warn};

impl AuthService {
    /// 注册：哈希密码并把待验证用户写入缓存，验证码在后台生成并发送。
    ///
    /// 返回时验证码可能尚未发送；后台失败只记录日志。
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn register(&self, req: RegisterRequest) -> Result<()> {
        Self::validate_name("first_name", &req.first_name)?;
        Self::validate_name("last_name", &req.last_name)?;
        Self::validate_email(&req.email)?;
        Self::validate_password_strength(&req.password)?;

        let password_hash = hash_password(&req.password, self.config.bcrypt_cost).await?;
        let pending = NewUser {
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            phone_number: None,
            gender: None,
            username: None,
            profile_image_url: None,
            password_hash,
            user_type: UserType::User,
        };

        let payload = serde_json::to_string(&pending)
            .map_err(|e| IdentityError::Internal(format!("failed to serialize user: {e}")))?;
        // 同一邮箱重复注册直接覆盖
        self.cache
            .set(
                &pending_user_key(&pending.email),
                &payload,
                self.config.pending_ttl,
            )
            .await
            .map_err(cache_error)?;

        self.spawn_code_dispatch(CodePurpose::Registration, pending.email);
        info!("registration staged");
        Ok(())
    }

    /// 后台发送验证码：没有 join、没有取消，结果只写日志。
    fn spawn_code_dispatch(&self, purpose: CodePurpose, email: String) {
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(e) = service.send_verification_code(purpose, &email).await {
                error!(email = %email, error = %e, "failed to send verification code");
            }
        });
    }

    /// 生成验证码，写入 `<purpose_prefix><email>`（覆盖旧码），再交给通知服务发送
    #[instrument(skip(self))]
    pub(super) async fn send_verification_code(
        &self,
        purpose: CodePurpose,
        email: &str,
    ) -> Result<()> {
        let code = generate_random_code(self.config.code_length)?;
        self.cache
            .set(&code_key(purpose, email), &code, self.config.code_ttl)
            .await
            .map_err(cache_error)?;

        self.notifier
            .send_email(SendEmailRequest::verification(email, &code))
            .await
            .map_err(|e| IdentityError::Internal(e.to_string()))?;

        info!("verification code sent");
        Ok(())
    }

    /// 验证注册：核对验证码，成功后落库、清理缓存并签发 token
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn verify(&self, req: VerifyRequest) -> Result<AuthSession> {
        let pending_key = pending_user_key(&req.email);
        let payload = self
            .cache
            .get(&pending_key)
            .await
            .map_err(cache_error)?
            .ok_or_else(|| {
                IdentityError::NotFound("pending registration (missing or expired)".into())
            })?;

        let pending: NewUser = serde_json::from_str(&payload).map_err(|e| {
            error!(error = %e, "malformed pending registration payload");
            IdentityError::Internal("failed to decode pending registration".into())
        })?;

        let code_cache_key = code_key(CodePurpose::Registration, &req.email);
        let stored_code = self
            .cache
            .get(&code_cache_key)
            .await
            .map_err(cache_error)?
            .ok_or(IdentityError::CodeExpired)?;

        if !codes_match(&req.code, &stored_code) {
            warn!("verification failed: incorrect code");
            return Err(IdentityError::IncorrectCode);
        }

        let user = self
            .users
            .create(pending)
            .await
            .map_err(|e| store_error(e, "user"))?;
        info!(user_id = %user.id, "registration verified");

        // 已消费，删除失败不影响本次结果
        for key in [&pending_key, &code_cache_key] {
            if let Err(e) = self.cache.delete(key).await {
                warn!(key = %key, error = %e, "failed to clear consumed cache entry");
            }
        }

        let token = self.issue_token(&user)?;
        Ok(AuthSession {
            user: user.into(),
            token,
        })
    }

    /// 用户登录
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn login(&self, req: LoginRequest) -> Result<AuthSession> {
        let user = match self.users.get_by_email(&req.email).await {
            Ok(user) => user,
            Err(crate::store::StoreError::NotFound) => {
                warn!("login failed: unknown email");
                return Err(if self.config.reveal_unknown_email {
                    IdentityError::NotFound("user".into())
                } else {
                    IdentityError::InvalidCredentials
                });
            }
            Err(e) => return Err(store_error(e, "user")),
        };

        if !check_password(&req.password, &user.password_hash).await? {
            warn!(user_id = %user.id, "login failed: invalid password");
            return Err(IdentityError::InvalidCredentials);
        }

        info!(user_id = %user.id, "user logged in");
        let token = self.issue_token(&user)?;
        Ok(AuthSession {
            user: user.into(),
            token,
        })
    }

    /// 校验 token 并查询 (角色, 资源, 动作) 的权限；无权限不是错误
    #[instrument(skip(self, req), fields(resource = %req.resource, action = %req.action))]
    pub async fn verify_token(&self, req: VerifyTokenRequest) -> Result<TokenCheck> {
        let claims = self.authenticate(&req.access_token)?;
        let has_permission = self
            .permissions
            .check_permission(claims.user_type.as_str(), &req.resource, &req.action)
            .await
            .map_err(|e| store_error(e, "permission"))?;
        Ok(TokenCheck {
            claims,
            has_permission,
        })
    }

    /// 只校验签名与过期时间
    pub fn authenticate(&self, access_token: &str) -> Result<TokenClaims> {
        self.tokens.verify_token(access_token)
    }

    fn issue_token(&self, user: &User) -> Result<IssuedToken> {
        let ttl = chrono::Duration::from_std(self.config.token_ttl)
            .map_err(|e| IdentityError::Internal(format!("invalid token ttl: {e}")))?;
        self.tokens.issue_for(user, ttl)
    }
}
