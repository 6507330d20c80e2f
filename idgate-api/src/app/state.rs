use idgate_core::AuthService;
use std::sync::Arc;

/// Shared application state for handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
    /// 登录接口限流（按 IP）
    pub login_limiter: Arc<crate::app::RateLimiter>,
    /// 注册接口限流（按 IP，防止验证码轰炸）
    pub register_limiter: Arc<crate::app::RateLimiter>,
    /// 是否信任 X-Real-IP / X-Forwarded-For（仅部署在反向代理后开启）
    pub trust_proxy_headers: bool,
}
