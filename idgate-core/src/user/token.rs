//! JWT 签发与校验

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::models::{User, UserType};
use crate::config::AuthConfig;
use crate::error::{IdentityError, Result};

/// JWT Claims 结构
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    /// Token 唯一 ID
    pub jti: String,
    /// Subject: 用户 ID
    pub sub: String,
    pub user_id: i64,
    pub email: String,
    pub user_type: UserType,
    pub iss: String,
    pub aud: String,
    /// 签发时间戳 (Unix timestamp)
    pub iat: i64,
    /// 过期时间戳 (Unix timestamp)
    pub exp: i64,
}

impl TokenClaims {
    pub fn issued_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.iat, 0).single().unwrap_or_default()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_default()
    }
}

/// 签发结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub token_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// 无状态 token 签发器：有效性只取决于签名和过期时间
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    audience: String,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
        }
    }

    /// 为已落库用户签发 token
    pub fn issue_for(&self, user: &User, ttl: Duration) -> Result<IssuedToken> {
        let claims = self.claims_for(user.id, &user.email, user.user_type.clone(), Utc::now(), ttl);
        self.create_token(&claims)
    }

    pub fn claims_for(
        &self,
        user_id: i64,
        email: &str,
        user_type: UserType,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> TokenClaims {
        TokenClaims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: user_id.to_string(),
            user_id,
            email: email.to_string(),
            user_type,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }

    /// 对 claims 签名
    pub fn create_token(&self, claims: &TokenClaims) -> Result<IssuedToken> {
        let access_token = encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| IdentityError::Internal(format!("failed to sign token: {}", e)))?;
        Ok(IssuedToken {
            access_token,
            token_id: claims.jti.clone(),
            issued_at: claims.issued_at(),
            expires_at: claims.expires_at(),
        })
    }

    /// 校验签名、过期时间、iss/aud。任何失败都统一为 Unauthenticated，不暴露具体原因。
    pub fn verify_token(&self, token: &str) -> Result<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_audience(&[self.audience.as_str()]);
        validation.set_issuer(&[self.issuer.as_str()]);
        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!(error = %e, "token rejected");
                IdentityError::Unauthenticated("invalid token".into())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer(secret: &str) -> TokenIssuer {
        TokenIssuer::new(&AuthConfig::new(secret))
    }

    #[test]
    fn round_trip_preserves_claims() {
        let tokens = issuer("test-secret");
        let claims = tokens.claims_for(42, "ann@x.com", UserType::Admin, Utc::now(), Duration::hours(24));
        let issued = tokens.create_token(&claims).unwrap();
        assert_eq!(issued.token_id, claims.jti);

        let decoded = tokens.verify_token(&issued.access_token).unwrap();
        assert_eq!(decoded, claims);
        assert_eq!(decoded.expires_at() - decoded.issued_at(), Duration::hours(24));
    }

    #[test]
    fn expired_token_is_unauthenticated() {
        let tokens = issuer("test-secret");
        let claims = tokens.claims_for(1, "a@b.c", UserType::User, Utc::now(), Duration::seconds(-5));
        let issued = tokens.create_token(&claims).unwrap();
        let err = tokens.verify_token(&issued.access_token).unwrap_err();
        assert_eq!(err.category(), "unauthenticated");
    }

    #[test]
    fn wrong_secret_and_garbage_fail_the_same_way() {
        let tokens = issuer("test-secret");
        let other = issuer("other-secret");
        let claims = tokens.claims_for(1, "a@b.c", UserType::User, Utc::now(), Duration::hours(1));
        let issued = other.create_token(&claims).unwrap();

        let bad_sig = tokens.verify_token(&issued.access_token).unwrap_err();
        let garbage = tokens.verify_token("not.a.token").unwrap_err();
        assert_eq!(bad_sig.to_string(), garbage.to_string());
    }

    #[test]
    fn foreign_audience_is_rejected() {
        let tokens = issuer("test-secret");
        let foreign = TokenIssuer::new(
            &AuthConfig::new("test-secret").with_claims_context("idgate-api", "someone-else"),
        );
        let claims = foreign.claims_for(1, "a@b.c", UserType::User, Utc::now(), Duration::hours(1));
        let issued = foreign.create_token(&claims).unwrap();
        assert!(tokens.verify_token(&issued.access_token).is_err());
    }
}
