use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{AppError, Entity, Result};
use crate::fields::{field_map, StoredRecord};
use crate::keys::Collection;
use crate::models::{field, Session, SessionToken, User, WithUser};
use crate::store::RecordStore;
use crate::traits::{Clock, KvStore, TokenSource};

use super::{resolve_user, UserRepo};

/// Login sessions keyed by random token. A user holds at most one: the
/// token in their `session` field. Creating a new session revokes the old.
#[derive(Clone)]
pub struct SessionRepo {
    records: RecordStore,
    users: UserRepo,
    tokens: Arc<dyn TokenSource>,
}

impl SessionRepo {
    pub fn new(
        kv: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        users: UserRepo,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            records: RecordStore::new(kv, Collection::Session).with_clock(clock),
            users,
            tokens,
        }
    }

    /// Opens a session for `user` and points their `session` field at it.
    /// Any previous session of the user is deleted.
    pub async fn create(&self, user: &User) -> Result<SessionToken> {
        let current = self
            .users
            .get(user.id)
            .await?
            .ok_or_else(|| AppError::not_found(Entity::User, user.id))?;

        let token = self.tokens.generate()?;
        if !token.is_well_formed() {
            return Err(AppError::Validation(format!(
                "token source issued a malformed token ({} chars)",
                token.as_str().len()
            )));
        }
        let session = Session {
            token: token.clone(),
            user: user.id,
            date: self.records.now(),
        };
        self.records.set(&token, &session.to_fields()).await?;
        self.users
            .records()
            .set(user.id, &field_map([(field::SESSION, token.to_string())]))
            .await?;

        if let Some(previous) = current.session.filter(|previous| *previous != token) {
            self.records.delete(&previous).await?;
            info!(user_id = %user.id, "previous session revoked");
        }
        info!(user_id = %user.id, "session created");
        Ok(token)
    }

    /// The session with its user resolved, or `None` if the token is unknown.
    pub async fn get(&self, token: &SessionToken) -> Result<Option<WithUser<Session>>> {
        match self.load(token).await? {
            Some(session) => resolve_user(&self.users, session).await.map(Some),
            None => Ok(None),
        }
    }

    /// Malformed tokens are never looked up; they read as unknown.
    async fn load(&self, token: &SessionToken) -> Result<Option<Session>> {
        if !token.is_well_formed() {
            debug!("ignoring malformed session token");
            return Ok(None);
        }
        self.records.get_as::<Session>(token).await
    }

    /// Clears the owner's `session` field (when it still names this token)
    /// and deletes the session. Returns `false` for an unknown token.
    pub async fn delete(&self, token: &SessionToken) -> Result<bool> {
        let Some(session) = self.load(token).await? else {
            return Ok(false);
        };
        if let Some(user) = self.users.get(session.user).await? {
            if user.session.as_ref() == Some(token) {
                self.users
                    .records()
                    .delete_field(user.id, &[field::SESSION])
                    .await?;
            }
        }
        self.records.delete(token).await?;
        info!(user_id = %session.user, "session deleted");
        Ok(true)
    }

    /// Verifies credentials and opens a session on success.
    pub async fn login(&self, username: &str, password: &str) -> Result<Option<SessionToken>> {
        match self.users.verify_credentials(username, password).await? {
            Some(user) => self.create(&user).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn logout(&self, token: &SessionToken) -> Result<bool> {
        self.delete(token).await
    }

    /// The logged-in user for `token`. A session only counts while it is
    /// still the one its user points at.
    pub async fn authenticate(&self, token: &SessionToken) -> Result<Option<User>> {
        let user = self
            .get(token)
            .await?
            .and_then(|session| session.user)
            .filter(|user| user.session.as_ref() == Some(token));
        Ok(user)
    }
}
