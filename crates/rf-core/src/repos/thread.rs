use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::fields::{timestamp_value, FieldMap, StoredRecord};
use crate::keys::Collection;
use crate::models::{field, Id, Post, Sub, Thread, User, WithUser};
use crate::page::Page;
use crate::store::RecordStore;
use crate::traits::{Clock, KvStore};

use super::{parse_ids, resolve_user, resolve_users, PostRepo, UserRepo};

/// Fields of a thread that may change after creation.
#[derive(Debug, Clone, Default)]
pub struct ThreadUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
}

/// Discussions. Each thread is linked into `sub:{id}:threads` and
/// `user:{id}:threads` and owns `thread:{id}:posts`.
#[derive(Clone)]
pub struct ThreadRepo {
    records: RecordStore,
    subs: RecordStore,
    users: UserRepo,
    posts: PostRepo,
}

impl ThreadRepo {
    pub fn new(kv: Arc<dyn KvStore>, clock: Arc<dyn Clock>, users: UserRepo, posts: PostRepo) -> Self {
        let records = RecordStore::new(kv, Collection::Thread).with_clock(clock);
        Self {
            subs: records.sibling(Collection::Sub),
            records,
            users,
            posts,
        }
    }

    /// Starts a thread by `user` in `sub`. Fails with `NotFound` when either
    /// has been deleted since it was loaded.
    pub async fn create(
        &self,
        user: &User,
        sub: &Sub,
        title: &str,
        body: &str,
    ) -> Result<WithUser<Thread>> {
        self.subs.require(sub.id).await?;
        self.users.records().require(user.id).await?;

        let id = self.records.generate_id().await?;
        let created = self.records.now();
        let thread = Thread {
            id,
            title: title.to_string(),
            body: body.to_string(),
            user: user.id,
            sub: sub.id,
            created,
            edited: created,
        };
        self.records.set(id, &thread.to_fields()).await?;

        let sub_threads = self.subs.children_key(sub.id, Collection::Thread);
        self.subs.add_member(&sub_threads, id).await?;
        self.users.link_thread(user.id, id).await?;

        info!(thread_id = %id, sub_id = %sub.id, user_id = %user.id, "thread created");
        Ok(WithUser {
            record: thread,
            user: Some(user.clone()),
        })
    }

    /// The thread with its author resolved.
    pub async fn get(&self, id: Id) -> Result<Option<WithUser<Thread>>> {
        match self.records.get_as::<Thread>(id).await? {
            Some(thread) => resolve_user(&self.users, thread).await.map(Some),
            None => Ok(None),
        }
    }

    /// Updates title and/or body and bumps `edited`.
    pub async fn edit(&self, id: Id, update: ThreadUpdate) -> Result<Option<WithUser<Thread>>> {
        if self.records.get(id).await?.is_none() {
            return Ok(None);
        }
        let mut fields = FieldMap::new();
        if let Some(title) = update.title {
            fields.insert(field::TITLE.to_string(), title);
        }
        if let Some(body) = update.body {
            fields.insert(field::BODY.to_string(), body);
        }
        if !fields.is_empty() {
            fields.insert(field::EDITED.to_string(), timestamp_value(self.records.now()));
            self.records.edit(id, None, &fields).await?;
        }
        self.get(id).await
    }

    /// Every thread, newest first.
    pub async fn all(&self, page: Page) -> Result<Vec<WithUser<Thread>>> {
        let threads = self.records.all_page_as(page).await?;
        resolve_users(&self.users, threads).await
    }

    pub async fn by_user(&self, user_id: Id, page: Page) -> Result<Vec<WithUser<Thread>>> {
        let ids = self.users.thread_ids(user_id, page).await?;
        self.load(&ids).await
    }

    /// The thread's posts, newest first.
    pub async fn posts(&self, thread_id: Id, page: Page) -> Result<Vec<WithUser<Post>>> {
        let key = self.records.children_key(thread_id, Collection::Post);
        let ids = self.records.members_page(&key, page).await?;
        self.posts.load(&ids).await
    }

    /// Fetches threads by id in order, skipping dangling ids.
    pub async fn load(&self, ids: &[String]) -> Result<Vec<WithUser<Thread>>> {
        let threads = self.records.load_many(ids).await?;
        resolve_users(&self.users, threads).await
    }

    pub async fn link_post(&self, thread_id: Id, post_id: Id) -> Result<bool> {
        let key = self.records.children_key(thread_id, Collection::Post);
        self.records.add_member(&key, post_id).await
    }

    pub async fn unlink_post(&self, thread_id: Id, post_id: Id) -> Result<bool> {
        let key = self.records.children_key(thread_id, Collection::Post);
        self.records.remove_member(&key, post_id).await
    }

    /// Deletes the thread's posts, unlinks it from its sub and author, and
    /// deletes it. Returns `false` if it was already absent.
    pub async fn delete(&self, id: Id) -> Result<bool> {
        let Some(thread) = self.records.get_as::<Thread>(id).await? else {
            return Ok(false);
        };

        let posts_key = self.records.children_key(id, Collection::Post);
        let post_ids = parse_ids(Collection::Post, &self.records.members(&posts_key).await?);
        for post_id in &post_ids {
            self.posts.delete(*post_id).await?;
        }
        self.records.delete_set(&posts_key).await?;

        let sub_threads = self.subs.children_key(thread.sub, Collection::Thread);
        self.subs.remove_member(&sub_threads, id).await?;
        self.users.unlink_thread(thread.user, id).await?;
        self.records.delete(id).await?;
        info!(thread_id = %id, posts = post_ids.len(), "thread deleted");
        Ok(true)
    }
}
