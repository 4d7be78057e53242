//! # Domain Models
//!
//! These structs represent the core entities of Rusty-Forum.
//! Ids come from one global counter, so they are integers that never repeat;
//! sessions are keyed by a random token instead.

use std::fmt;
use std::num::ParseIntError;
use std::ops::Deref;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::fields::{field_map, timestamp_value, FieldMap, Record, StoredRecord};
use crate::keys::Collection;

/// Stored field names.
pub mod field {
    pub const USERNAME: &str = "username";
    pub const PASSWORD: &str = "password";
    pub const SESSION: &str = "session";
    pub const IS_ADMIN: &str = "is_admin";
    pub const USER: &str = "user";
    pub const DATE: &str = "date";
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const CATEGORY: &str = "category";
    pub const SUB: &str = "sub";
    pub const THREAD: &str = "thread";
    pub const BODY: &str = "body";
    pub const CREATED: &str = "created";
    pub const EDITED: &str = "edited";
}

/// Stored form of a true admin flag.
const ADMIN_TRUE: &str = "True";
const ADMIN_FALSE: &str = "False";

/// A collection-scoped record id drawn from the global counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(pub u64);

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for Id {
    type Err = ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse().map(Id)
    }
}

/// Opaque, unguessable session key (base64 of random bytes).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Base64 length of the shortest issued token (20 random bytes).
    pub const MIN_LEN: usize = 27;

    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Whether this could be an issued token: base64 text of at least
    /// [`Self::MIN_LEN`] characters. Anything else (e.g., `all`) would
    /// address a key that is not a session hash.
    pub fn is_well_formed(&self) -> bool {
        self.0.len() >= Self::MIN_LEN
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'=' | b'-' | b'_'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A registered account.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    pub username: String,
    /// Hashed; never serialized outward.
    #[serde(skip_serializing, default)]
    pub password: String,
    /// The single active session, if logged in.
    #[serde(skip_serializing, default)]
    pub session: Option<SessionToken>,
    #[serde(default)]
    pub is_admin: bool,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password", &"<hash>")
            .field("session", &self.session.as_ref().map(|_| "<token>"))
            .field("is_admin", &self.is_admin)
            .finish()
    }
}

impl User {
    /// Whether this user may edit or delete content owned by `owner`:
    /// their own, or anyone's when admin.
    pub fn can_moderate(&self, owner: Id) -> bool {
        self.id == owner || self.is_admin
    }

    pub(crate) fn admin_value(is_admin: bool) -> &'static str {
        if is_admin {
            ADMIN_TRUE
        } else {
            ADMIN_FALSE
        }
    }
}

impl StoredRecord for User {
    const COLLECTION: Collection = Collection::User;

    fn from_record(record: &Record) -> Result<Self> {
        Ok(User {
            id: record.id().parse().map_err(|_| bad_id(record))?,
            username: record.require(field::USERNAME)?.to_string(),
            password: record.require(field::PASSWORD)?.to_string(),
            session: record.get(field::SESSION).map(SessionToken::new),
            is_admin: matches!(record.get(field::IS_ADMIN), Some("True" | "true" | "1")),
        })
    }

    fn to_fields(&self) -> FieldMap {
        let mut fields = field_map([
            (field::USERNAME, self.username.clone()),
            (field::PASSWORD, self.password.clone()),
        ]);
        if let Some(session) = &self.session {
            fields.insert(field::SESSION.to_string(), session.to_string());
        }
        if self.is_admin {
            fields.insert(field::IS_ADMIN.to_string(), ADMIN_TRUE.to_string());
        }
        fields
    }
}

/// A login session. Its key is the token, not a counter id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: SessionToken,
    pub user: Id,
    pub date: DateTime<Utc>,
}

impl StoredRecord for Session {
    const COLLECTION: Collection = Collection::Session;

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Session {
            token: SessionToken::new(record.id()),
            user: record.parse(field::USER)?,
            date: record.timestamp(field::DATE)?,
        })
    }

    fn to_fields(&self) -> FieldMap {
        field_map([
            (field::USER, self.user.to_string()),
            (field::DATE, timestamp_value(self.date)),
        ])
    }
}

/// Top-level grouping of sub-forums.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: Id,
    pub title: String,
}

impl StoredRecord for Category {
    const COLLECTION: Collection = Collection::Category;

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Category {
            id: record.id().parse().map_err(|_| bad_id(record))?,
            title: record.require(field::TITLE)?.to_string(),
        })
    }

    fn to_fields(&self) -> FieldMap {
        field_map([(field::TITLE, self.title.clone())])
    }
}

/// A sub-forum inside a category; threads are posted here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sub {
    pub id: Id,
    pub title: String,
    pub description: String,
    pub category: Id,
}

impl StoredRecord for Sub {
    const COLLECTION: Collection = Collection::Sub;

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Sub {
            id: record.id().parse().map_err(|_| bad_id(record))?,
            title: record.require(field::TITLE)?.to_string(),
            description: record.get(field::DESCRIPTION).unwrap_or_default().to_string(),
            category: record.parse(field::CATEGORY)?,
        })
    }

    fn to_fields(&self) -> FieldMap {
        field_map([
            (field::TITLE, self.title.clone()),
            (field::DESCRIPTION, self.description.clone()),
            (field::CATEGORY, self.category.to_string()),
        ])
    }
}

/// A discussion started by a user in a sub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: Id,
    pub title: String,
    pub body: String,
    pub user: Id,
    pub sub: Id,
    pub created: DateTime<Utc>,
    pub edited: DateTime<Utc>,
}

impl StoredRecord for Thread {
    const COLLECTION: Collection = Collection::Thread;

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Thread {
            id: record.id().parse().map_err(|_| bad_id(record))?,
            title: record.require(field::TITLE)?.to_string(),
            body: record.require(field::BODY)?.to_string(),
            user: record.parse(field::USER)?,
            sub: record.parse(field::SUB)?,
            created: record.timestamp(field::CREATED)?,
            edited: record.timestamp(field::EDITED)?,
        })
    }

    fn to_fields(&self) -> FieldMap {
        field_map([
            (field::TITLE, self.title.clone()),
            (field::BODY, self.body.clone()),
            (field::USER, self.user.to_string()),
            (field::SUB, self.sub.to_string()),
            (field::CREATED, timestamp_value(self.created)),
            (field::EDITED, timestamp_value(self.edited)),
        ])
    }
}

/// A reply inside a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Id,
    pub body: String,
    pub user: Id,
    pub thread: Id,
    pub created: DateTime<Utc>,
    pub edited: DateTime<Utc>,
}

impl StoredRecord for Post {
    const COLLECTION: Collection = Collection::Post;

    fn from_record(record: &Record) -> Result<Self> {
        Ok(Post {
            id: record.id().parse().map_err(|_| bad_id(record))?,
            body: record.require(field::BODY)?.to_string(),
            user: record.parse(field::USER)?,
            thread: record.parse(field::THREAD)?,
            created: record.timestamp(field::CREATED)?,
            edited: record.timestamp(field::EDITED)?,
        })
    }

    fn to_fields(&self) -> FieldMap {
        field_map([
            (field::BODY, self.body.clone()),
            (field::USER, self.user.to_string()),
            (field::THREAD, self.thread.to_string()),
            (field::CREATED, timestamp_value(self.created)),
            (field::EDITED, timestamp_value(self.edited)),
        ])
    }
}

/// A record whose `user` reference has been fetched.
///
/// `user` is `None` when the referenced account no longer exists;
/// user deletion leaves authored content in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithUser<T> {
    pub record: T,
    pub user: Option<User>,
}

impl<T> Deref for WithUser<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.record
    }
}

fn bad_id(record: &Record) -> crate::error::AppError {
    crate::error::AppError::InvalidRecord {
        key: record.key(),
        reason: format!("id {:?} is not numeric", record.id()),
    }
}
