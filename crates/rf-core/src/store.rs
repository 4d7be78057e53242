//! # Record Store
//!
//! Generic CRUD over a [`KvStore`] for one collection: id generation, record
//! hashes, the `{collection}:all` set, the unique-value index and per-parent
//! relationship sets. Entity repositories compose these primitives; they
//! alone know which fields are unique and which parents own a record, so
//! `delete` here never touches indexes or relationship sets.
//!
//! # Consistency
//! Every primitive is one atomic store call. Sequences of primitives are not
//! transactional. The unique index is the one place where ordering matters:
//! values are reserved with a set-if-absent before any other write, so two
//! concurrent creators of the same value cannot both succeed.

use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::fields::{FieldMap, Record, StoredRecord, SystemClock};
use crate::keys::{Collection, NEXT_ID_KEY};
use crate::models::Id;
use crate::page::Page;
use crate::traits::{Clock, KvStore};

/// Collection-scoped access to the key-value store.
#[derive(Clone)]
pub struct RecordStore {
    kv: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    collection: Collection,
}

impl RecordStore {
    pub fn new(kv: Arc<dyn KvStore>, collection: Collection) -> Self {
        Self {
            kv,
            clock: Arc::new(SystemClock),
            collection,
        }
    }

    /// Replaces the wall clock that stamps records and scores set members.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// A store handle for another collection sharing the same backend.
    pub fn sibling(&self, collection: Collection) -> Self {
        Self {
            kv: self.kv.clone(),
            clock: self.clock.clone(),
            collection,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // Record Operations

    /// Next id from the global counter. Ids are never reused.
    pub async fn generate_id(&self) -> Result<Id> {
        let next = self.kv.incr(NEXT_ID_KEY).await?;
        let id = u64::try_from(next)
            .map_err(|_| anyhow!("counter `{NEXT_ID_KEY}` is negative: {next}"))?;
        Ok(Id(id))
    }

    /// The record's fields plus its id, or `None` if absent.
    pub async fn get(&self, id: impl fmt::Display) -> Result<Option<Record>> {
        let id = id.to_string();
        let fields = self.kv.hgetall(&self.collection.record_key(&id)).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(Some(Record::new(self.collection, id, fields)))
    }

    /// Like [`Self::get`], but an absent record is `NotFound`.
    pub async fn require(&self, id: impl fmt::Display) -> Result<Record> {
        let id = id.to_string();
        match self.get(&id).await? {
            Some(record) => Ok(record),
            None => Err(AppError::not_found(self.collection.entity(), id)),
        }
    }

    pub async fn get_as<T: StoredRecord>(&self, id: impl fmt::Display) -> Result<Option<T>> {
        self.check_collection::<T>()?;
        match self.get(id).await? {
            Some(record) => T::from_record(&record).map(Some),
            None => Ok(None),
        }
    }

    /// Writes `fields` onto the record and makes sure its id is in the
    /// `all` set. On a new id this is the creation primitive.
    pub async fn set(&self, id: impl fmt::Display, fields: &FieldMap) -> Result<()> {
        let id = id.to_string();
        self.kv
            .hset(&self.collection.record_key(&id), fields)
            .await?;
        self.add_member(&self.collection.all_key(), &id).await?;
        debug!(collection = %self.collection, %id, fields = fields.len(), "record written");
        Ok(())
    }

    /// Writes `fields`, first moving the unique index entry when
    /// `link_field` is one of them and its value changes.
    pub async fn edit(
        &self,
        id: impl fmt::Display,
        link_field: Option<&str>,
        fields: &FieldMap,
    ) -> Result<()> {
        let id = id.to_string();
        if let Some((link, new_value)) =
            link_field.and_then(|link| fields.get(link).map(|value| (link, value)))
        {
            let current = self
                .kv
                .hget(&self.collection.record_key(&id), link)
                .await?;
            match current {
                Some(old_value) => self.relink_value(&id, &old_value, new_value).await?,
                None => self.claim_value(&id, new_value).await?,
            }
        }
        self.set(&id, fields).await
    }

    /// Removes the record hash and its `all` membership. Returns whether
    /// the hash existed.
    pub async fn delete(&self, id: impl fmt::Display) -> Result<bool> {
        let id = id.to_string();
        self.remove_member(&self.collection.all_key(), &id).await?;
        let existed = self.kv.del(&self.collection.record_key(&id)).await?;
        debug!(collection = %self.collection, %id, existed, "record deleted");
        Ok(existed)
    }

    /// Removes individual fields, leaving the record live.
    pub async fn delete_field(&self, id: impl fmt::Display, fields: &[&str]) -> Result<u64> {
        let names: Vec<String> = fields.iter().map(|name| name.to_string()).collect();
        let removed = self
            .kv
            .hdel(&self.collection.record_key(id), &names)
            .await?;
        Ok(removed)
    }

    /// Every live id, newest first.
    pub async fn all_ids(&self) -> Result<Vec<String>> {
        self.members(&self.collection.all_key()).await
    }

    pub async fn all(&self) -> Result<Vec<Record>> {
        let ids = self.all_ids().await?;
        self.load_records(&ids).await
    }

    pub async fn all_as<T: StoredRecord>(&self) -> Result<Vec<T>> {
        let ids = self.all_ids().await?;
        self.load_many(&ids).await
    }

    /// One page of the `all` set, newest first.
    pub async fn all_page_as<T: StoredRecord>(&self, page: Page) -> Result<Vec<T>> {
        let ids = self.members_page(&self.collection.all_key(), page).await?;
        self.load_many(&ids).await
    }

    /// Fetches each id in order, skipping ids whose hash is gone.
    pub async fn load_records(&self, ids: &[String]) -> Result<Vec<Record>> {
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get(id).await? {
                Some(record) => records.push(record),
                None => warn!(collection = %self.collection, %id, "skipping dangling member"),
            }
        }
        Ok(records)
    }

    pub async fn load_many<T: StoredRecord>(&self, ids: &[String]) -> Result<Vec<T>> {
        self.check_collection::<T>()?;
        self.load_records(ids)
            .await?
            .iter()
            .map(T::from_record)
            .collect()
    }

    /// Typed loads only decode records of the entity's own collection.
    fn check_collection<T: StoredRecord>(&self) -> Result<()> {
        if T::COLLECTION != self.collection {
            return Err(anyhow!(
                "`{}` store cannot load `{}` records",
                self.collection,
                T::COLLECTION
            )
            .into());
        }
        Ok(())
    }

    // Unique Index Operations

    /// Unconditionally points `value` at `id`. Prefer [`Self::reserve_value`]
    /// when creating, which cannot clobber another record's entry.
    pub async fn link_value_to_id(&self, value: &str, id: impl fmt::Display) -> Result<()> {
        let fields = FieldMap::from([(value.to_string(), id.to_string())]);
        self.kv.hset(&self.collection.index_key(), &fields).await?;
        Ok(())
    }

    /// Atomically points `value` at `id` if no record holds it yet.
    pub async fn reserve_value(&self, value: &str, id: impl fmt::Display) -> Result<bool> {
        let reserved = self
            .kv
            .hset_nx(&self.collection.index_key(), value, &id.to_string())
            .await?;
        Ok(reserved)
    }

    pub async fn get_id_by_value(&self, value: &str) -> Result<Option<String>> {
        let id = self.kv.hget(&self.collection.index_key(), value).await?;
        Ok(id)
    }

    pub async fn unlink_value(&self, value: &str) -> Result<bool> {
        let removed = self
            .kv
            .hdel(&self.collection.index_key(), &[value.to_string()])
            .await?;
        Ok(removed > 0)
    }

    /// Moves `id`'s index entry from `old_value` to `new_value`.
    ///
    /// The new value is reserved before the old one is released, so a failed
    /// move leaves the original entry intact.
    pub async fn relink_value(
        &self,
        id: impl fmt::Display,
        old_value: &str,
        new_value: &str,
    ) -> Result<()> {
        if old_value == new_value {
            return Ok(());
        }
        let id = id.to_string();
        self.claim_value(&id, new_value).await?;
        if self.get_id_by_value(old_value).await?.as_deref() == Some(id.as_str()) {
            self.unlink_value(old_value).await?;
        }
        debug!(collection = %self.collection, %id, old_value, new_value, "index entry moved");
        Ok(())
    }

    /// Reserves `value` for `id`, tolerating an entry that already points there.
    async fn claim_value(&self, id: &str, value: &str) -> Result<()> {
        if self.reserve_value(value, id).await? {
            return Ok(());
        }
        match self.get_id_by_value(value).await? {
            Some(holder) if holder == id => Ok(()),
            _ => Err(AppError::already_exists(self.collection.entity(), value)),
        }
    }

    // Relationship Set Operations

    /// `{collection}:{parent_id}:{child}s` for a parent in this collection.
    pub fn children_key(&self, parent_id: impl fmt::Display, child: Collection) -> String {
        self.collection.children_key(parent_id, child)
    }

    /// Adds `member` scored by the current time. Re-adding keeps the
    /// original position.
    pub async fn add_member(&self, set_key: &str, member: impl fmt::Display) -> Result<bool> {
        let score = self.now().timestamp();
        let added = self
            .kv
            .zadd(set_key, &member.to_string(), score)
            .await?;
        Ok(added)
    }

    pub async fn remove_member(&self, set_key: &str, member: impl fmt::Display) -> Result<bool> {
        let removed = self.kv.zrem(set_key, &member.to_string()).await?;
        Ok(removed)
    }

    /// Every member, newest first.
    pub async fn members(&self, set_key: &str) -> Result<Vec<String>> {
        let members = self.kv.zrevrange(set_key, 0, -1).await?;
        Ok(members)
    }

    /// One page of members, newest first. Pages past the end are empty.
    pub async fn members_page(&self, set_key: &str, page: Page) -> Result<Vec<String>> {
        match page.range() {
            Some((start, stop)) => Ok(self.kv.zrevrange(set_key, start, stop).await?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn is_member(&self, set_key: &str, member: impl fmt::Display) -> Result<bool> {
        let score = self.kv.zscore(set_key, &member.to_string()).await?;
        Ok(score.is_some())
    }

    /// Drops a whole relationship set, e.g. after its parent is deleted.
    pub async fn delete_set(&self, set_key: &str) -> Result<bool> {
        let existed = self.kv.del(set_key).await?;
        Ok(existed)
    }
}
