//! 认证配置：签名密钥、各类 TTL、验证码长度等，进程启动时构造一次。

use std::time::Duration;

const DEFAULT_JWT_ISSUER: &str = "idgate-api";
const DEFAULT_JWT_AUDIENCE: &str = "idgate-clients";

/// Auth orchestrator configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// JWT 签名密钥
    pub jwt_secret: String,
    /// JWT issuer
    pub jwt_issuer: String,
    /// JWT audience
    pub jwt_audience: String,
    /// Access token 有效期
    pub token_ttl: Duration,
    /// 待验证注册信息在缓存中的有效期
    pub pending_ttl: Duration,
    /// 验证码有效期
    pub code_ttl: Duration,
    /// 验证码位数
    pub code_length: usize,
    /// bcrypt cost
    pub bcrypt_cost: u32,
    /// 登录时是否区分“邮箱不存在”与“密码错误”
    pub reveal_unknown_email: bool,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            jwt_issuer: DEFAULT_JWT_ISSUER.to_string(),
            jwt_audience: DEFAULT_JWT_AUDIENCE.to_string(),
            token_ttl: Duration::from_secs(24 * 3600),
            pending_ttl: Duration::from_secs(10 * 60),
            code_ttl: Duration::from_secs(60),
            code_length: 6,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            reveal_unknown_email: false,
        }
    }

    /// 配置 JWT iss/aud
    pub fn with_claims_context(
        mut self,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        self.jwt_issuer = issuer.into();
        self.jwt_audience = audience.into();
        self
    }

    /// 配置待验证注册与验证码的 TTL
    pub fn with_staging_ttl(mut self, pending_ttl: Duration, code_ttl: Duration) -> Self {
        self.pending_ttl = pending_ttl;
        self.code_ttl = code_ttl;
        self
    }

    pub fn with_token_ttl(mut self, token_ttl: Duration) -> Self {
        self.token_ttl = token_ttl;
        self
    }

    pub fn with_bcrypt_cost(mut self, cost: u32) -> Self {
        self.bcrypt_cost = cost;
        self
    }

    pub fn with_reveal_unknown_email(mut self, reveal: bool) -> Self {
        self.reveal_unknown_email = reveal;
        self
    }
}
