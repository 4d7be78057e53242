//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::fields::FieldMap;
use crate::models::SessionToken;

/// Key-value persistence contract: hashes, score-ordered sets and a counter.
///
/// Each call is atomic on its own key. Nothing here spans keys, so callers
/// compose multi-step sequences on a best-effort basis.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Increments the integer at `key` (starting from 0) and returns the new value.
    async fn incr(&self, key: &str) -> anyhow::Result<i64>;

    // Hash Operations
    async fn hget(&self, key: &str, field: &str) -> anyhow::Result<Option<String>>;
    /// Returns an empty map when the key does not exist.
    async fn hgetall(&self, key: &str) -> anyhow::Result<FieldMap>;
    async fn hset(&self, key: &str, fields: &FieldMap) -> anyhow::Result<()>;
    /// Writes `field` only if it is absent. Returns whether the write happened.
    async fn hset_nx(&self, key: &str, field: &str, value: &str) -> anyhow::Result<bool>;
    /// Returns the number of fields removed.
    async fn hdel(&self, key: &str, fields: &[String]) -> anyhow::Result<u64>;

    // Sorted Set Operations
    /// Adds `member` if absent. An existing member keeps its original score.
    async fn zadd(&self, key: &str, member: &str, score: i64) -> anyhow::Result<bool>;
    async fn zrem(&self, key: &str, member: &str) -> anyhow::Result<bool>;
    /// Members ordered by descending score, inclusive range; negative
    /// indices count back from the end.
    async fn zrevrange(&self, key: &str, start: isize, stop: isize)
        -> anyhow::Result<Vec<String>>;
    async fn zscore(&self, key: &str, member: &str) -> anyhow::Result<Option<i64>>;

    /// Removes a key of any type. Returns whether it existed.
    async fn del(&self, key: &str) -> anyhow::Result<bool>;
}

/// One-way password hashing contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait PasswordHasher: Send + Sync {
    /// Produces an opaque, self-describing hash for storage.
    fn hash(&self, plaintext: &str) -> anyhow::Result<String>;
    /// Checks a plaintext against a stored hash. Malformed hashes never verify.
    fn verify(&self, hash: &str, plaintext: &str) -> bool;
}

/// Source of unguessable session tokens.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait TokenSource: Send + Sync {
    fn generate(&self) -> anyhow::Result<SessionToken>;
}

/// Source of the current time, used to score set members and stamp records.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Clock: Send + Sync {
    /// The current time at the precision records keep (whole seconds).
    fn now(&self) -> DateTime<Utc>;
}
