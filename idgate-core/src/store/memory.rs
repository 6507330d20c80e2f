//! In-memory store implementations, suitable for tests and single-process development.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use super::{paginate, PermissionRule, PermissionStore, PermissionTable, StoreError, UserStore};
use crate::user::{ListUsersParams, NewUser, User, UserPage, UserUpdate};

#[derive(Debug, Default)]
struct UserTable {
    next_id: i64,
    users: BTreeMap<i64, User>,
}

/// In-memory user store. Ids start at 1 and are never reused.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    inner: RwLock<UserTable>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.users.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut table = self.inner.write().await;
        if table.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::AlreadyExists(format!("email: {}", user.email)));
        }
        table.next_id += 1;
        let created = User::from_new(table.next_id, user, Utc::now());
        table.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get(&self, id: i64) -> Result<User, StoreError> {
        self.inner
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.inner
            .read()
            .await
            .users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, update: UserUpdate) -> Result<User, StoreError> {
        let mut table = self.inner.write().await;
        let user = table.users.get_mut(&update.id).ok_or(StoreError::NotFound)?;
        user.apply_update(update);
        Ok(user.clone())
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), StoreError> {
        let mut table = self.inner.write().await;
        let user = table.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn list(&self, params: &ListUsersParams) -> Result<UserPage, StoreError> {
        let table = self.inner.read().await;
        Ok(paginate(table.users.values().cloned(), params))
    }
}

/// In-memory permission table.
#[derive(Debug, Default)]
pub struct MemoryPermissionStore {
    table: RwLock<PermissionTable>,
}

impl MemoryPermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rules(rules: impl IntoIterator<Item = PermissionRule>) -> Self {
        Self {
            table: RwLock::new(PermissionTable::from_rules(rules)),
        }
    }

    pub async fn allow(&self, role: &str, resource: &str, action: &str) {
        self.set(role, resource, action, true).await;
    }

    pub async fn deny(&self, role: &str, resource: &str, action: &str) {
        self.set(role, resource, action, false).await;
    }

    async fn set(&self, role: &str, resource: &str, action: &str, allowed: bool) {
        self.table.write().await.insert(PermissionRule {
            role: role.to_string(),
            resource: resource.to_string(),
            action: action.to_string(),
            allowed,
        });
    }
}

#[async_trait]
impl PermissionStore for MemoryPermissionStore {
    async fn check_permission(
        &self,
        role: &str,
        resource: &str,
        action: &str,
    ) -> Result<bool, StoreError> {
        Ok(self.table.read().await.check(role, resource, action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::UserType;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            first_name: "Ann".into(),
            last_name: "Lee".into(),
            email: email.into(),
            phone_number: None,
            gender: None,
            username: None,
            profile_image_url: None,
            password_hash: "hash".into(),
            user_type: UserType::User,
        }
    }

    #[tokio::test]
    async fn create_assigns_ids_and_rejects_duplicate_email() {
        let store = MemoryUserStore::new();
        let a = store.create(new_user("a@x.com")).await.unwrap();
        let b = store.create(new_user("b@x.com")).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));

        let err = store.create(new_user("a@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let store = MemoryUserStore::new();
        assert!(matches!(store.delete(9).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn permission_changes_are_visible() {
        let store = MemoryPermissionStore::new();
        assert!(!store.check_permission("user", "posts", "read").await.unwrap());
        store.allow("user", "posts", "read").await;
        assert!(store.check_permission("user", "posts", "read").await.unwrap());
        store.deny("user", "posts", "read").await;
        assert!(!store.check_permission("user", "posts", "read").await.unwrap());
    }
}
