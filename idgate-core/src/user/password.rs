//! 输入校验与密码管理：验证强度、修改密码

use super::crypto::{check_password, hash_password};
use super::manager::store_error;
use super::models::*;
use super::AuthService;
use crate::error::{IdentityError, Result};
use tracing::{info, instrument, warn};

impl AuthService {
    /// 验证密码强度
    pub(super) fn validate_password_strength(password: &str) -> Result<()> {
        if password.len() < 8 {
            return Err(IdentityError::Validation(
                "password must be at least 8 characters".into(),
            ));
        }
        let mut has_upper = false;
        let mut has_lower = false;
        let mut has_digit = false;
        let mut has_symbol = false;
        for ch in password.chars() {
            if ch.is_ascii_uppercase() {
                has_upper = true;
            } else if ch.is_ascii_lowercase() {
                has_lower = true;
            } else if ch.is_ascii_digit() {
                has_digit = true;
            } else {
                has_symbol = true;
            }
        }
        if !(has_upper && has_lower && (has_digit || has_symbol)) {
            return Err(IdentityError::Validation(
                "password must contain upper and lower case letters and a digit or symbol".into(),
            ));
        }
        Ok(())
    }

    /// 只检查形状：`local@domain`，不做大小写归一
    pub(super) fn validate_email(email: &str) -> Result<()> {
        let valid = match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.is_empty()
                    && !domain.contains('@')
                    && !email.chars().any(char::is_whitespace)
            }
            None => false,
        };
        if !valid {
            return Err(IdentityError::Validation(format!("invalid email: {email}")));
        }
        Ok(())
    }

    pub(super) fn validate_name(field: &str, value: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(IdentityError::Validation(format!("{field} is required")));
        }
        Ok(())
    }

    /// 修改用户密码，可选择强制修改（管理员）。
    #[instrument(skip(self, current_password, new_password))]
    pub async fn change_password(
        &self,
        id: i64,
        current_password: Option<&str>,
        new_password: &str,
        force: bool,
    ) -> Result<User> {
        let mut user = self.get_user(id).await?;

        Self::validate_password_strength(new_password)?;
        // 校验旧密码（非强制模式）
        if !force {
            let current = current_password.ok_or_else(|| {
                IdentityError::Validation("current password is required".into())
            })?;
            if !check_password(current, &user.password_hash).await? {
                warn!(user_id = %id, "password change rejected: wrong current password");
                return Err(IdentityError::InvalidCredentials);
            }
        }

        user.password_hash = hash_password(new_password, self.config.bcrypt_cost).await?;
        self.users
            .update_password(id, &user.password_hash)
            .await
            .map_err(|e| store_error(e, &format!("user: {id}")))?;

        info!(user_id = %id, "password changed");
        Ok(user)
    }
}
