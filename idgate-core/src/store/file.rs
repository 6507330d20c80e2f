//! 基于本地文件系统的持久化存储：每个用户一个 JSON 文件，另有 email 索引。
//!
//! 目录结构：
//! - `<data_dir>/users/<id>.json`
//! - `<data_dir>/users/index.json`（email -> id 索引 + 下一个 id）
//! - `<data_dir>/permissions.json`（权限规则数组）

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use super::{paginate, PermissionRule, PermissionStore, PermissionTable, StoreError, UserStore};
use crate::user::{ListUsersParams, NewUser, User, UserPage, UserUpdate};

const INDEX_FILE: &str = "index.json";

/// email 索引
#[derive(Debug, Default, Serialize, Deserialize)]
struct UserIndex {
    #[serde(default)]
    next_id: i64,
    #[serde(default)]
    by_email: HashMap<String, i64>,
}

/// 先写同目录下的临时文件再 rename，读者不会看到写了一半的文件
async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, data).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// 文件用户存储
#[derive(Debug)]
pub struct FileUserStore {
    /// 数据根目录
    data_dir: PathBuf,
    /// 写操作互斥（email 唯一性检查与写入是原子的）；读操作取共享锁
    lock: RwLock<()>,
}

impl FileUserStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            lock: RwLock::new(()),
        }
    }

    /// 确保用户目录存在
    pub async fn ensure_dirs(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(self.users_dir()).await?;
        Ok(())
    }

    /// 用户存储目录
    fn users_dir(&self) -> PathBuf {
        self.data_dir.join("users")
    }

    /// 用户文件路径
    fn user_path(&self, id: i64) -> PathBuf {
        self.users_dir().join(format!("{}.json", id))
    }

    fn index_path(&self) -> PathBuf {
        self.users_dir().join(INDEX_FILE)
    }

    async fn load_index(&self) -> Result<UserIndex, StoreError> {
        let path = self.index_path();
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(UserIndex::default());
        }
        let data = tokio::fs::read(&path).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    async fn save_index(&self, index: &UserIndex) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(index)?;
        write_atomic(&self.index_path(), &data).await
    }

    async fn persist_user(&self, user: &User) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(user)?;
        write_atomic(&self.user_path(user.id), &data).await
    }

    async fn read_user(&self, id: i64) -> Result<User, StoreError> {
        let path = self.user_path(id);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StoreError::NotFound);
        }
        let data = tokio::fs::read(&path).await?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// 读取全部用户文件（跳过 index.json、临时文件与无法解析的文件）
    async fn load_all(&self) -> Result<Vec<User>, StoreError> {
        self.ensure_dirs().await?;
        let mut users = Vec::new();
        let mut entries = tokio::fs::read_dir(self.users_dir()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.file_name().is_some_and(|n| n == INDEX_FILE) {
                continue;
            }
            if path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }
            let data = tokio::fs::read(&path).await?;
            match serde_json::from_slice::<User>(&data) {
                Ok(user) => users.push(user),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable user file"),
            }
        }
        Ok(users)
    }
}

#[async_trait]
impl UserStore for FileUserStore {
    #[instrument(skip(self, user), fields(email = %user.email))]
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let _guard = self.lock.write().await;
        self.ensure_dirs().await?;

        let mut index = self.load_index().await?;
        if index.by_email.contains_key(&user.email) {
            return Err(StoreError::AlreadyExists(format!("email: {}", user.email)));
        }

        index.next_id += 1;
        let created = User::from_new(index.next_id, user, Utc::now());
        self.persist_user(&created).await?;
        index.by_email.insert(created.email.clone(), created.id);
        // 索引最后写入；失败时删除刚写的用户文件，不留孤儿记录
        if let Err(e) = self.save_index(&index).await {
            if let Err(cleanup) = tokio::fs::remove_file(self.user_path(created.id)).await {
                warn!(user_id = %created.id, error = %cleanup, "failed to remove orphan user file");
            }
            return Err(e);
        }

        info!(user_id = %created.id, "created user");
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn get(&self, id: i64) -> Result<User, StoreError> {
        let _guard = self.lock.read().await;
        self.read_user(id).await
    }

    #[instrument(skip(self))]
    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        let _guard = self.lock.read().await;
        let index = self.load_index().await?;
        let id = *index.by_email.get(email).ok_or(StoreError::NotFound)?;
        self.read_user(id).await
    }

    #[instrument(skip(self, update), fields(user_id = %update.id))]
    async fn update(&self, update: UserUpdate) -> Result<User, StoreError> {
        let _guard = self.lock.write().await;
        let mut user = self.read_user(update.id).await?;
        user.apply_update(update);
        self.persist_user(&user).await?;
        info!(user_id = %user.id, "updated user");
        Ok(user)
    }

    #[instrument(skip(self, password_hash))]
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), StoreError> {
        let _guard = self.lock.write().await;
        let mut user = self.read_user(id).await?;
        user.password_hash = password_hash.to_string();
        self.persist_user(&user).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let _guard = self.lock.write().await;
        let path = self.user_path(id);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StoreError::NotFound);
        }
        let mut index = self.load_index().await?;
        index.by_email.retain(|_, uid| *uid != id);
        self.save_index(&index).await?;
        tokio::fs::remove_file(&path).await?;
        info!(user_id = %id, "deleted user");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list(&self, params: &ListUsersParams) -> Result<UserPage, StoreError> {
        let _guard = self.lock.read().await;
        let users = self.load_all().await?;
        Ok(paginate(users, params))
    }
}

/// 从 `permissions.json` 加载的只读权限表
#[derive(Debug)]
pub struct FilePermissionStore {
    table: PermissionTable,
}

impl FilePermissionStore {
    /// 读取 `<data_dir>/permissions.json`；文件不存在时为空表（全部拒绝）
    pub async fn load<P: AsRef<Path>>(data_dir: P) -> Result<Self, StoreError> {
        let path = data_dir.as_ref().join("permissions.json");
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            warn!(path = %path.display(), "permissions file not found; all checks will deny");
            return Ok(Self {
                table: PermissionTable::default(),
            });
        }
        let data = tokio::fs::read(&path).await?;
        let rules: Vec<PermissionRule> = serde_json::from_slice(&data)?;
        info!(rules = rules.len(), "loaded permission rules");
        Ok(Self {
            table: PermissionTable::from_rules(rules),
        })
    }
}

#[async_trait]
impl PermissionStore for FilePermissionStore {
    async fn check_permission(
        &self,
        role: &str,
        resource: &str,
        action: &str,
    ) -> Result<bool, StoreError> {
        Ok(self.table.check(role, resource, action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::UserType;
    use tempfile::TempDir;

    fn new_user(first: &str, email: &str) -> NewUser {
        NewUser {
            first_name: first.into(),
            last_name: "Lee".into(),
            email: email.into(),
            phone_number: None,
            gender: None,
            username: Some(first.to_lowercase()),
            profile_image_url: None,
            password_hash: "hash".into(),
            user_type: UserType::User,
        }
    }

    #[tokio::test]
    async fn create_get_and_lookup_by_email() {
        let dir = TempDir::new().unwrap();
        let store = FileUserStore::new(dir.path());

        let created = store.create(new_user("Ann", "ann@x.com")).await.unwrap();
        assert_eq!(created.id, 1);

        let by_id = store.get(created.id).await.unwrap();
        let by_email = store.get_by_email("ann@x.com").await.unwrap();
        assert_eq!(by_id, created);
        assert_eq!(by_email, created);
        assert!(matches!(
            store.get_by_email("bob@x.com").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = FileUserStore::new(dir.path());
        store.create(new_user("Ann", "ann@x.com")).await.unwrap();
        let err = store.create(new_user("Other", "ann@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = FileUserStore::new(dir.path());
            store.create(new_user("Ann", "ann@x.com")).await.unwrap();
        }
        let store = FileUserStore::new(dir.path());
        let next = store.create(new_user("Bob", "bob@x.com")).await.unwrap();
        assert_eq!(next.id, 2);
        assert_eq!(store.get_by_email("ann@x.com").await.unwrap().id, 1);
    }

    #[tokio::test]
    async fn update_and_password_change_persist() {
        let dir = TempDir::new().unwrap();
        let store = FileUserStore::new(dir.path());
        let user = store.create(new_user("Ann", "ann@x.com")).await.unwrap();

        let updated = store
            .update(UserUpdate {
                id: user.id,
                last_name: Some("Park".into()),
                gender: Some(Some("female".into())),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.last_name, "Park");
        assert_eq!(updated.gender.as_deref(), Some("female"));
        assert_eq!(updated.created_at, user.created_at);

        store.update_password(user.id, "new-hash").await.unwrap();
        assert_eq!(store.get(user.id).await.unwrap().password_hash, "new-hash");
    }

    #[tokio::test]
    async fn delete_frees_email_and_reports_missing() {
        let dir = TempDir::new().unwrap();
        let store = FileUserStore::new(dir.path());
        let user = store.create(new_user("Ann", "ann@x.com")).await.unwrap();

        store.delete(user.id).await.unwrap();
        assert!(matches!(store.get(user.id).await, Err(StoreError::NotFound)));
        assert!(matches!(store.delete(user.id).await, Err(StoreError::NotFound)));

        // 删除后邮箱可以重新注册，且 id 不复用
        let again = store.create(new_user("Ann", "ann@x.com")).await.unwrap();
        assert_eq!(again.id, 2);
    }

    #[tokio::test]
    async fn list_searches_and_paginates() {
        let dir = TempDir::new().unwrap();
        let store = FileUserStore::new(dir.path());
        for (first, email) in [("Ann", "ann@x.com"), ("Bob", "bob@y.com"), ("Anna", "anna@y.com")] {
            store.create(new_user(first, email)).await.unwrap();
        }

        let page = store
            .list(&ListUsersParams {
                page: 1,
                limit: 1,
                search: "ANN".into(),
            })
            .await
            .unwrap();
        assert_eq!(page.count, 2);
        assert_eq!(page.users.len(), 1);

        let all = store.list(&ListUsersParams::default()).await.unwrap();
        assert_eq!(all.count, 3);
    }

    #[tokio::test]
    async fn permissions_load_from_file() {
        let dir = TempDir::new().unwrap();
        let missing = FilePermissionStore::load(dir.path()).await.unwrap();
        assert!(!missing.check_permission("user", "posts", "read").await.unwrap());

        std::fs::write(
            dir.path().join("permissions.json"),
            r#"[
                {"role":"user","resource":"posts","action":"read","allowed":true},
                {"role":"user","resource":"posts","action":"delete","allowed":false}
            ]"#,
        )
        .unwrap();
        let store = FilePermissionStore::load(dir.path()).await.unwrap();
        assert!(store.check_permission("user", "posts", "read").await.unwrap());
        assert!(!store.check_permission("user", "posts", "delete").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn reads_never_see_partial_writes() {
        let dir = TempDir::new().unwrap();
        let store = std::sync::Arc::new(FileUserStore::new(dir.path()));
        store.create(new_user("Ann", "ann@x.com")).await.unwrap();

        let writer = {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..200 {
                    let email = format!("u{}@x.com", i);
                    store.create(new_user("U", &email)).await.unwrap();
                }
            })
        };

        let mut reads = 0;
        while !writer.is_finished() {
            let user = store.get_by_email("ann@x.com").await.unwrap();
            assert_eq!(user.id, 1);
            let page = store.list(&ListUsersParams::default()).await.unwrap();
            assert!(page.count >= 1);
            reads += 1;
        }
        writer.await.unwrap();
        assert!(reads > 0);
        assert_eq!(store.list(&ListUsersParams::default()).await.unwrap().count, 201);
    }

    #[tokio::test]
    async fn failed_index_write_leaves_no_orphan_user() {
        let dir = TempDir::new().unwrap();
        let store = FileUserStore::new(dir.path());
        store.ensure_dirs().await.unwrap();
        // 临时索引路径被目录占用，写索引必然失败
        std::fs::create_dir(dir.path().join("users").join("index.json.tmp")).unwrap();

        assert!(store.create(new_user("Ann", "ann@x.com")).await.is_err());
        assert!(!dir.path().join("users").join("1.json").exists());
        assert_eq!(store.list(&ListUsersParams::default()).await.unwrap().count, 0);
        assert!(matches!(
            store.get_by_email("ann@x.com").await,
            Err(StoreError::NotFound)
        ));
    }
}
