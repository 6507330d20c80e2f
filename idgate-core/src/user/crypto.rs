//! 密码哈希与验证码工具函数

use crate::error::{IdentityError, Result};
use bcrypt::{hash, verify};
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;

/// bcrypt 允许的最低 cost，仅测试使用
#[cfg(test)]
pub(crate) const TEST_BCRYPT_COST: u32 = 4;

/// 异步哈希密码（在阻塞线程中执行 bcrypt）
pub async fn hash_password(password: &str, cost: u32) -> Result<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash(&password, cost))
        .await
        .map_err(|e| IdentityError::Internal(format!("spawn_blocking failed: {}", e)))?
        .map_err(|e| IdentityError::Internal(format!("bcrypt hash failed: {}", e)))
}

/// 异步验证密码；不匹配返回 `Ok(false)`
pub async fn check_password(password: &str, hash: &str) -> Result<bool> {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || verify(&password, &hash))
        .await
        .map_err(|e| IdentityError::Internal(format!("spawn_blocking failed: {}", e)))?
        .map_err(|e| IdentityError::Internal(format!("bcrypt verify failed: {}", e)))
}

/// 生成定长数字验证码（允许前导 0）。
///
/// 字节来自系统 CSPRNG，丢弃 >= 250 的字节以保证每一位均匀分布。
pub fn generate_random_code(length: usize) -> Result<String> {
    let mut code = String::with_capacity(length);
    let mut buf = [0u8; 16];
    while code.len() < length {
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| IdentityError::Internal(format!("entropy source failed: {}", e)))?;
        for byte in buf.iter().filter(|b| **b < 250) {
            if code.len() == length {
                break;
            }
            code.push(char::from(b'0' + byte % 10));
        }
    }
    Ok(code)
}

/// 常量时间比较验证码
pub fn codes_match(submitted: &str, stored: &str) -> bool {
    submitted.as_bytes().ct_eq(stored.as_bytes()).into()
}
