use std::sync::Arc;

use tracing::info;

use crate::error::{AppError, Entity, Result};
use crate::fields::{FieldMap, StoredRecord};
use crate::keys::Collection;
use crate::models::{field, Category, Id, Sub, Thread, WithUser};
use crate::page::Page;
use crate::store::RecordStore;
use crate::traits::{Clock, KvStore};

use super::{parse_ids, ThreadRepo};

/// Fields of a sub that may change after creation.
#[derive(Debug, Clone, Default)]
pub struct SubUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Sub-forums, indexed by unique title. Each sub is linked into
/// `category:{id}:subs` and owns `sub:{id}:threads`.
#[derive(Clone)]
pub struct SubRepo {
    records: RecordStore,
    categories: RecordStore,
    threads: ThreadRepo,
}

impl SubRepo {
    pub fn new(kv: Arc<dyn KvStore>, clock: Arc<dyn Clock>, threads: ThreadRepo) -> Self {
        let records = RecordStore::new(kv, Collection::Sub).with_clock(clock);
        Self {
            categories: records.sibling(Collection::Category),
            records,
            threads,
        }
    }

    /// Creates a sub under `category`. Fails with `AlreadyExists` when the
    /// title is taken and `NotFound` when the category is gone.
    pub async fn create(&self, category: &Category, title: &str, description: &str) -> Result<Sub> {
        self.categories.require(category.id).await?;
        if self.records.get_id_by_value(title).await?.is_some() {
            return Err(AppError::already_exists(Entity::Sub, title));
        }
        let id = self.records.generate_id().await?;
        if !self.records.reserve_value(title, id).await? {
            return Err(AppError::already_exists(Entity::Sub, title));
        }

        let sub = Sub {
            id,
            title: title.to_string(),
            description: description.to_string(),
            category: category.id,
        };
        self.records.set(id, &sub.to_fields()).await?;
        let category_subs = self.categories.children_key(category.id, Collection::Sub);
        self.categories.add_member(&category_subs, id).await?;

        info!(sub_id = %id, category_id = %category.id, "sub created");
        Ok(sub)
    }

    pub async fn get(&self, id: Id) -> Result<Option<Sub>> {
        self.records.get_as(id).await
    }

    pub async fn by_title(&self, title: &str) -> Result<Option<Sub>> {
        match self.records.get_id_by_value(title).await? {
            Some(id) => self.records.get_as(id).await,
            None => Ok(None),
        }
    }

    pub async fn all(&self) -> Result<Vec<Sub>> {
        self.records.all_as().await
    }

    /// Fetches subs by id in order, skipping dangling ids.
    pub async fn load(&self, ids: &[String]) -> Result<Vec<Sub>> {
        self.records.load_many(ids).await
    }

    /// Updates title and/or description; a new title moves the index entry.
    pub async fn edit(&self, id: Id, update: SubUpdate) -> Result<Option<Sub>> {
        if self.get(id).await?.is_none() {
            return Ok(None);
        }
        let mut fields = FieldMap::new();
        if let Some(title) = update.title {
            fields.insert(field::TITLE.to_string(), title);
        }
        if let Some(description) = update.description {
            fields.insert(field::DESCRIPTION.to_string(), description);
        }
        if !fields.is_empty() {
            self.records.edit(id, Some(field::TITLE), &fields).await?;
        }
        self.get(id).await
    }

    pub async fn link_thread(&self, sub_id: Id, thread_id: Id) -> Result<bool> {
        let key = self.records.children_key(sub_id, Collection::Thread);
        self.records.add_member(&key, thread_id).await
    }

    pub async fn unlink_thread(&self, sub_id: Id, thread_id: Id) -> Result<bool> {
        let key = self.records.children_key(sub_id, Collection::Thread);
        self.records.remove_member(&key, thread_id).await
    }

    /// One page of the sub's threads, newest first. Empty when the sub has
    /// no threads or the page is past the end.
    pub async fn get_threads(&self, sub_id: Id, page: Page) -> Result<Vec<WithUser<Thread>>> {
        let key = self.records.children_key(sub_id, Collection::Thread);
        let ids = self.records.members_page(&key, page).await?;
        self.threads.load(&ids).await
    }

    /// Deletes every thread of the sub (and their posts), the title index
    /// entry, the category link and the sub. Returns `false` if absent.
    pub async fn delete(&self, id: Id) -> Result<bool> {
        let Some(sub) = self.get(id).await? else {
            return Ok(false);
        };

        let threads_key = self.records.children_key(id, Collection::Thread);
        let thread_ids = parse_ids(Collection::Thread, &self.records.members(&threads_key).await?);
        for thread_id in &thread_ids {
            self.threads.delete(*thread_id).await?;
        }
        self.records.delete_set(&threads_key).await?;

        if self.records.get_id_by_value(&sub.title).await? == Some(id.to_string()) {
            self.records.unlink_value(&sub.title).await?;
        }
        let category_subs = self.categories.children_key(sub.category, Collection::Sub);
        self.categories.remove_member(&category_subs, id).await?;
        self.records.delete(id).await?;
        info!(sub_id = %id, threads = thread_ids.len(), "sub deleted");
        Ok(true)
    }
}
