//! 用户数据模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use std::fmt;
use std::str::FromStr;

use super::token::{IssuedToken, TokenClaims};
use crate::error::IdentityError;

/// 用户类型（权限检查的角色维度）
///
/// `user`/`admin` 有内置语义，其余名称原样保留为 `Other`，由权限规则解释。
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub enum UserType {
    #[default]
    User,
    Admin,
    Other(String),
}

impl UserType {
    pub fn as_str(&self) -> &str {
        match self {
            UserType::User => "user",
            UserType::Admin => "admin",
            UserType::Other(name) => name,
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(IdentityError::Validation("user type must not be empty".into())),
            "user" => Ok(UserType::User),
            "admin" => Ok(UserType::Admin),
            other => Ok(UserType::Other(other.to_string())),
        }
    }
}

impl TryFrom<String> for UserType {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UserType> for String {
    fn from(value: UserType) -> Self {
        match value {
            UserType::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

/// 尚未落库的用户（待验证注册的缓存载荷），没有 id 和 created_at
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub gender: Option<String>,
    pub username: Option<String>,
    pub profile_image_url: Option<String>,
    /// bcrypt 哈希后的密码
    pub password_hash: String,
    #[serde(default)]
    pub user_type: UserType,
}

/// 已持久化的用户账户（存储模型，包含密码哈希）
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// 存储层分配的自增 ID
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    /// 唯一，原样存储
    pub email: String,
    pub phone_number: Option<String>,
    pub gender: Option<String>,
    pub username: Option<String>,
    pub profile_image_url: Option<String>,
    pub password_hash: String,
    pub user_type: UserType,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// 由存储层在提交时调用
    pub fn from_new(id: i64, new_user: NewUser, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            phone_number: new_user.phone_number,
            gender: new_user.gender,
            username: new_user.username,
            profile_image_url: new_user.profile_image_url,
            password_hash: new_user.password_hash,
            user_type: new_user.user_type,
            created_at,
        }
    }

    /// 应用部分更新；email、类型、密码、创建时间保持不变
    pub fn apply_update(&mut self, update: UserUpdate) {
        if let Some(first_name) = update.first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            self.last_name = last_name;
        }
        if let Some(phone_number) = update.phone_number {
            self.phone_number = phone_number;
        }
        if let Some(gender) = update.gender {
            self.gender = gender;
        }
        if let Some(username) = update.username {
            self.username = username;
        }
        if let Some(profile_image_url) = update.profile_image_url {
            self.profile_image_url = profile_image_url;
        }
    }
}

/// 部分更新请求。可选字段使用双层 Option：外层 None 表示不修改，`Some(None)` 表示清空。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default, skip_serializing)]
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub phone_number: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub gender: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub username: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub profile_image_url: Option<Option<String>>,
}

/// 用户列表查询参数（page 从 1 开始）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListUsersParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub search: String,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

impl Default for ListUsersParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
            search: String::new(),
        }
    }
}

impl ListUsersParams {
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.limit as usize
    }
}

/// 一页用户及匹配总数
#[derive(Debug, Clone)]
pub struct UserPage {
    pub users: Vec<User>,
    pub count: u64,
}

/// 用户信息（不含敏感信息）
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub gender: Option<String>,
    pub username: Option<String>,
    pub profile_image_url: Option<String>,
    pub user_type: UserType,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            phone_number: user.phone_number,
            gender: user.gender,
            username: user.username,
            profile_image_url: user.profile_image_url,
            user_type: user.user_type,
            created_at: user.created_at,
        }
    }
}

/// 注册请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// 注册验证请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub email: String,
    pub code: String,
}

/// 登录请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token 权限校验请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyTokenRequest {
    pub access_token: String,
    pub resource: String,
    pub action: String,
}

/// 管理员直接创建用户（跳过邮箱验证）
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone_number: Option<String>,
    pub gender: Option<String>,
    pub username: Option<String>,
    pub profile_image_url: Option<String>,
    #[serde(default)]
    pub user_type: UserType,
}

/// 验证/登录成功后的结果：用户 + access token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: UserSummary,
    pub token: IssuedToken,
}

/// VerifyToken 的结果；`has_permission == false` 不是错误
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenCheck {
    pub claims: TokenClaims,
    pub has_permission: bool,
}
