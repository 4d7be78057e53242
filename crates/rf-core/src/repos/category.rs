use std::sync::Arc;

use tracing::info;

use crate::error::{AppError, Entity, Result};
use crate::fields::{field_map, StoredRecord};
use crate::keys::Collection;
use crate::models::{field, Category, Id, Sub};
use crate::store::RecordStore;
use crate::traits::{Clock, KvStore};

use super::{parse_ids, SubRepo};

/// Top-level categories, indexed by unique title. Each owns
/// `category:{id}:subs`.
#[derive(Clone)]
pub struct CategoryRepo {
    records: RecordStore,
    subs: SubRepo,
}

impl CategoryRepo {
    pub fn new(kv: Arc<dyn KvStore>, clock: Arc<dyn Clock>, subs: SubRepo) -> Self {
        Self {
            records: RecordStore::new(kv, Collection::Category).with_clock(clock),
            subs,
        }
    }

    /// Creates a category. Fails with `AlreadyExists` when the title is taken.
    pub async fn create(&self, title: &str) -> Result<Category> {
        if self.records.get_id_by_value(title).await?.is_some() {
            return Err(AppError::already_exists(Entity::Category, title));
        }
        let id = self.records.generate_id().await?;
        if !self.records.reserve_value(title, id).await? {
            return Err(AppError::already_exists(Entity::Category, title));
        }

        let category = Category {
            id,
            title: title.to_string(),
        };
        self.records.set(id, &category.to_fields()).await?;
        info!(category_id = %id, "category created");
        Ok(category)
    }

    pub async fn get(&self, id: Id) -> Result<Option<Category>> {
        self.records.get_as(id).await
    }

    pub async fn by_title(&self, title: &str) -> Result<Option<Category>> {
        match self.records.get_id_by_value(title).await? {
            Some(id) => self.records.get_as(id).await,
            None => Ok(None),
        }
    }

    pub async fn all(&self) -> Result<Vec<Category>> {
        self.records.all_as().await
    }

    /// Renames the category, moving its title index entry.
    pub async fn edit(&self, id: Id, title: &str) -> Result<Option<Category>> {
        if self.get(id).await?.is_none() {
            return Ok(None);
        }
        let fields = field_map([(field::TITLE, title.to_string())]);
        self.records.edit(id, Some(field::TITLE), &fields).await?;
        self.get(id).await
    }

    /// Creates a sub under this category.
    pub async fn create_sub(&self, category: &Category, title: &str, description: &str) -> Result<Sub> {
        self.subs.create(category, title, description).await
    }

    /// The category's subs, newest first.
    pub async fn subs(&self, category_id: Id) -> Result<Vec<Sub>> {
        let key = self.records.children_key(category_id, Collection::Sub);
        let ids = self.records.members(&key).await?;
        self.subs.load(&ids).await
    }

    /// Every category paired with its subs, as shown on the board index.
    pub async fn with_subs(&self) -> Result<Vec<(Category, Vec<Sub>)>> {
        let categories = self.all().await?;
        let mut listing = Vec::with_capacity(categories.len());
        for category in categories {
            let subs = self.subs(category.id).await?;
            listing.push((category, subs));
        }
        Ok(listing)
    }

    /// Deletes every sub of the category (cascading to their threads and
    /// posts), the title index entry and the category. Returns `false` if
    /// it was already absent.
    pub async fn delete(&self, id: Id) -> Result<bool> {
        let Some(category) = self.get(id).await? else {
            return Ok(false);
        };

        let subs_key = self.records.children_key(id, Collection::Sub);
        let sub_ids = parse_ids(Collection::Sub, &self.records.members(&subs_key).await?);
        for sub_id in &sub_ids {
            self.subs.delete(*sub_id).await?;
        }
        self.records.delete_set(&subs_key).await?;

        if self.records.get_id_by_value(&category.title).await? == Some(id.to_string()) {
            self.records.unlink_value(&category.title).await?;
        }
        self.records.delete(id).await?;
        info!(category_id = %id, subs = sub_ids.len(), "category deleted");
        Ok(true)
    }
}
