use std::sync::Arc;

use tracing::info;

use crate::error::{AppError, Entity, Result};
use crate::fields::{FieldMap, StoredRecord};
use crate::keys::Collection;
use crate::models::{field, Id, User};
use crate::page::Page;
use crate::store::RecordStore;
use crate::traits::{Clock, KvStore, PasswordHasher};

/// Fields a user may change. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    /// Plaintext; hashed before storage.
    pub password: Option<String>,
    pub is_admin: Option<bool>,
}

/// Accounts, indexed by unique username.
#[derive(Clone)]
pub struct UserRepo {
    records: RecordStore,
    hasher: Arc<dyn PasswordHasher>,
}

impl UserRepo {
    pub fn new(kv: Arc<dyn KvStore>, clock: Arc<dyn Clock>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self {
            records: RecordStore::new(kv, Collection::User).with_clock(clock),
            hasher,
        }
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    /// Registers a new account. Fails with `AlreadyExists` when the username
    /// is taken, including by a concurrent registration.
    pub async fn create(&self, username: &str, password: &str) -> Result<User> {
        if self.records.get_id_by_value(username).await?.is_some() {
            return Err(AppError::already_exists(Entity::User, username));
        }
        let password = self.hasher.hash(password)?;

        let id = self.records.generate_id().await?;
        if !self.records.reserve_value(username, id).await? {
            return Err(AppError::already_exists(Entity::User, username));
        }

        let user = User {
            id,
            username: username.to_string(),
            password,
            session: None,
            is_admin: false,
        };
        self.records.set(id, &user.to_fields()).await?;
        info!(user_id = %id, "user created");
        Ok(user)
    }

    pub async fn get(&self, id: Id) -> Result<Option<User>> {
        self.records.get_as(id).await
    }

    pub async fn by_username(&self, username: &str) -> Result<Option<User>> {
        match self.records.get_id_by_value(username).await? {
            Some(id) => self.records.get_as(id).await,
            None => Ok(None),
        }
    }

    pub async fn all(&self) -> Result<Vec<User>> {
        self.records.all_as().await
    }

    /// Looks up `username` and checks `password` against the stored hash.
    pub async fn verify_credentials(&self, username: &str, password: &str) -> Result<Option<User>> {
        let user = self
            .by_username(username)
            .await?
            .filter(|user| self.hasher.verify(&user.password, password));
        Ok(user)
    }

    /// Applies `update`, moving the username index on rename and re-hashing
    /// a new password. Returns `None` if the user is absent.
    pub async fn edit(&self, id: Id, update: UserUpdate) -> Result<Option<User>> {
        if self.get(id).await?.is_none() {
            return Ok(None);
        }

        let mut fields = FieldMap::new();
        if let Some(username) = update.username {
            fields.insert(field::USERNAME.to_string(), username);
        }
        if let Some(password) = update.password {
            fields.insert(field::PASSWORD.to_string(), self.hasher.hash(&password)?);
        }
        if let Some(is_admin) = update.is_admin {
            fields.insert(
                field::IS_ADMIN.to_string(),
                User::admin_value(is_admin).to_string(),
            );
        }
        if !fields.is_empty() {
            self.records.edit(id, Some(field::USERNAME), &fields).await?;
        }
        self.get(id).await
    }

    pub async fn set_admin(&self, id: Id, is_admin: bool) -> Result<Option<User>> {
        let update = UserUpdate {
            is_admin: Some(is_admin),
            ..UserUpdate::default()
        };
        self.edit(id, update).await
    }

    /// Deletes the account: username index entry, active session, the
    /// user's relationship sets and the record. Authored threads and posts
    /// are kept. Returns `false` if the user was already absent.
    pub async fn delete(&self, id: Id) -> Result<bool> {
        let Some(user) = self.get(id).await? else {
            return Ok(false);
        };

        if self.records.get_id_by_value(&user.username).await? == Some(id.to_string()) {
            self.records.unlink_value(&user.username).await?;
        }
        if let Some(token) = &user.session {
            self.records.sibling(Collection::Session).delete(token).await?;
        }
        self.records
            .delete_set(&self.records.children_key(id, Collection::Thread))
            .await?;
        self.records
            .delete_set(&self.records.children_key(id, Collection::Post))
            .await?;
        self.records.delete(id).await?;
        info!(user_id = %id, "user deleted");
        Ok(true)
    }

    // Relationship Sets

    pub async fn link_thread(&self, user_id: Id, thread_id: Id) -> Result<bool> {
        let key = self.records.children_key(user_id, Collection::Thread);
        self.records.add_member(&key, thread_id).await
    }

    pub async fn unlink_thread(&self, user_id: Id, thread_id: Id) -> Result<bool> {
        let key = self.records.children_key(user_id, Collection::Thread);
        self.records.remove_member(&key, thread_id).await
    }

    pub async fn link_post(&self, user_id: Id, post_id: Id) -> Result<bool> {
        let key = self.records.children_key(user_id, Collection::Post);
        self.records.add_member(&key, post_id).await
    }

    pub async fn unlink_post(&self, user_id: Id, post_id: Id) -> Result<bool> {
        let key = self.records.children_key(user_id, Collection::Post);
        self.records.remove_member(&key, post_id).await
    }

    /// Ids of the user's threads, newest first.
    pub async fn thread_ids(&self, user_id: Id, page: Page) -> Result<Vec<String>> {
        let key = self.records.children_key(user_id, Collection::Thread);
        self.records.members_page(&key, page).await
    }

    /// Ids of the user's posts, newest first.
    pub async fn post_ids(&self, user_id: Id, page: Page) -> Result<Vec<String>> {
        let key = self.records.children_key(user_id, Collection::Post);
        self.records.members_page(&key, page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::SystemClock;
    use crate::traits::{MockKvStore, MockPasswordHasher};
    use mockall::predicate::*;

    #[tokio::test]
    async fn test_create_rejects_indexed_username_before_hashing() {
        let mut kv = MockKvStore::new();
        kv.expect_hget()
            .with(eq("user:users"), eq("marv"))
            .returning(|_, _| Ok(Some("1".to_string())));
        kv.expect_incr().never();
        let mut hasher = MockPasswordHasher::new();
        hasher.expect_hash().never();

        let repo = UserRepo::new(Arc::new(kv), Arc::new(SystemClock), Arc::new(hasher));
        let err = repo.create("marv", "pass").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::AlreadyExists { entity: Entity::User, .. }
        ));
    }

    #[tokio::test]
    async fn test_create_loses_reservation_race() {
        let mut kv = MockKvStore::new();
        kv.expect_hget().returning(|_, _| Ok(None));
        kv.expect_incr().returning(|_| Ok(5));
        kv.expect_hset_nx()
            .with(eq("user:users"), eq("marv"), eq("5"))
            .returning(|_, _, _| Ok(false));
        kv.expect_hset().never();
        let mut hasher = MockPasswordHasher::new();
        hasher.expect_hash().returning(|_| Ok("hashed".to_string()));

        let repo = UserRepo::new(Arc::new(kv), Arc::new(SystemClock), Arc::new(hasher));
        assert!(repo.create("marv", "pass").await.unwrap_err().is_already_exists());
    }
}
