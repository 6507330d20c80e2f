use thiserror::Error;

/// Common result type for core operations.
pub type Result<T> = std::result::Result<T, IdentityError>;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("code_expired")]
    CodeExpired,
    #[error("incorrect_code")]
    IncorrectCode,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl IdentityError {
    /// 稳定的错误类别，供调用方决定重新输入验证码、重新注册或放弃。
    pub fn category(&self) -> &'static str {
        match self {
            IdentityError::Validation(_) => "validation",
            IdentityError::NotFound(_) => "not_found",
            IdentityError::CodeExpired => "code_expired",
            IdentityError::IncorrectCode => "incorrect_code",
            IdentityError::InvalidCredentials => "invalid_credentials",
            IdentityError::Unauthenticated(_) => "unauthenticated",
            IdentityError::Forbidden(_) => "forbidden",
            IdentityError::Conflict(_) => "conflict",
            IdentityError::Internal(_) | IdentityError::Io(_) | IdentityError::Serde(_) => {
                "internal"
            }
        }
    }

    /// 是否属于内部错误（细节只写日志，不返回给调用方）
    pub fn is_internal(&self) -> bool {
        self.category() == "internal"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_and_serde_are_internal() {
        let io = IdentityError::from(std::io::Error::other("disk"));
        assert_eq!(io.category(), "internal");
        let serde = serde_json::from_str::<u32>("nope").unwrap_err();
        assert!(IdentityError::from(serde).is_internal());
    }

    #[test]
    fn wrong_password_is_not_not_found() {
        assert_ne!(
            IdentityError::InvalidCredentials.category(),
            IdentityError::NotFound("user".into()).category()
        );
    }
}
