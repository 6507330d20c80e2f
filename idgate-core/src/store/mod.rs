//! Storage abstraction for users and permission rules.
//!
//! The auth service only talks to these traits, so backends (JSON files on disk,
//! in-memory maps for tests) can be swapped at construction time.

mod file;
mod memory;

pub use file::{FilePermissionStore, FileUserStore};
pub use memory::{MemoryPermissionStore, MemoryUserStore};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::user::{ListUsersParams, NewUser, User, UserPage, UserUpdate};

/// Uniform error type for all storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Durable user records, keyed by surrogate id and unique email.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Commit a new user. Assigns `id` and `created_at`; duplicate email is `AlreadyExists`.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    async fn get(&self, id: i64) -> Result<User, StoreError>;

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError>;

    /// Partial update of profile fields; email, type, password and created_at are untouched.
    async fn update(&self, update: UserUpdate) -> Result<User, StoreError>;

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), StoreError>;

    async fn delete(&self, id: i64) -> Result<(), StoreError>;

    /// One page of users (newest first) plus the total number of matches.
    async fn list(&self, params: &ListUsersParams) -> Result<UserPage, StoreError>;
}

/// (role, resource, action) -> allow/deny. Read-only from the auth service.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn check_permission(
        &self,
        role: &str,
        resource: &str,
        action: &str,
    ) -> Result<bool, StoreError>;
}

/// A single permission rule as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRule {
    pub role: String,
    pub resource: String,
    pub action: String,
    pub allowed: bool,
}

/// Lookup table shared by the permission backends. Missing rules deny.
#[derive(Debug, Clone, Default)]
pub(crate) struct PermissionTable {
    rules: HashMap<(String, String, String), bool>,
}

impl PermissionTable {
    pub(crate) fn from_rules(rules: impl IntoIterator<Item = PermissionRule>) -> Self {
        let mut table = Self::default();
        for rule in rules {
            table.insert(rule);
        }
        table
    }

    pub(crate) fn insert(&mut self, rule: PermissionRule) {
        self.rules
            .insert((rule.role, rule.resource, rule.action), rule.allowed);
    }

    pub(crate) fn check(&self, role: &str, resource: &str, action: &str) -> bool {
        self.rules
            .get(&(role.to_string(), resource.to_string(), action.to_string()))
            .copied()
            .unwrap_or(false)
    }
}

/// Case-insensitive substring match over name, email, username and phone number.
pub(crate) fn matches_search(user: &User, search: &str) -> bool {
    if search.is_empty() {
        return true;
    }
    let needle = search.to_lowercase();
    let contains = |field: &str| field.to_lowercase().contains(&needle);
    contains(&user.first_name)
        || contains(&user.last_name)
        || contains(&user.email)
        || user.username.as_deref().is_some_and(contains)
        || user.phone_number.as_deref().is_some_and(contains)
}

/// Filter, order newest first, and cut one page out of `users`.
pub(crate) fn paginate(
    users: impl IntoIterator<Item = User>,
    params: &ListUsersParams,
) -> UserPage {
    let mut matched: Vec<User> = users
        .into_iter()
        .filter(|u| matches_search(u, &params.search))
        .collect();
    matched.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    let count = matched.len() as u64;
    let users = matched
        .into_iter()
        .skip(params.offset())
        .take(params.limit as usize)
        .collect();
    UserPage { users, count }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::UserType;
    use chrono::{Duration, Utc};

    fn user(id: i64, first: &str, email: &str, phone: Option<&str>) -> User {
        User {
            id,
            first_name: first.into(),
            last_name: "Lee".into(),
            email: email.into(),
            phone_number: phone.map(Into::into),
            gender: None,
            username: None,
            profile_image_url: None,
            password_hash: "h".into(),
            user_type: UserType::User,
            created_at: Utc::now() + Duration::seconds(id),
        }
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let u = user(1, "Ann", "ann@x.com", Some("+998 90"));
        assert!(matches_search(&u, "aNN"));
        assert!(matches_search(&u, "LEE"));
        assert!(matches_search(&u, "998"));
        assert!(!matches_search(&u, "bob"));
    }

    #[test]
    fn paginate_orders_newest_first_and_counts_all_matches() {
        let users = (1..=25).map(|i| user(i, &format!("User{i}"), &format!("u{i}@x.com"), None));
        let params = ListUsersParams {
            page: 2,
            limit: 10,
            search: String::new(),
        };
        let page = paginate(users, &params);
        assert_eq!(page.count, 25);
        assert_eq!(page.users.len(), 10);
        assert_eq!(page.users[0].id, 15);
        assert_eq!(page.users[9].id, 6);
    }

    #[test]
    fn permission_table_denies_unknown_rules() {
        let table = PermissionTable::from_rules([PermissionRule {
            role: "user".into(),
            resource: "posts".into(),
            action: "create".into(),
            allowed: true,
        }]);
        assert!(table.check("user", "posts", "create"));
        assert!(!table.check("user", "posts", "delete"));
        assert!(!table.check("admin", "posts", "create"));
    }
}
