use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::fields::{field_map, timestamp_value, StoredRecord};
use crate::keys::Collection;
use crate::models::{field, Id, Post, Thread, User, WithUser};
use crate::page::Page;
use crate::store::RecordStore;
use crate::traits::{Clock, KvStore};

use super::{resolve_user, resolve_users, UserRepo};

/// Fields of a post that may change after creation.
#[derive(Debug, Clone, Default)]
pub struct PostUpdate {
    pub body: Option<String>,
}

/// Replies. Each post is linked into `thread:{id}:posts` and
/// `user:{id}:posts`.
#[derive(Clone)]
pub struct PostRepo {
    records: RecordStore,
    threads: RecordStore,
    users: UserRepo,
}

impl PostRepo {
    pub fn new(kv: Arc<dyn KvStore>, clock: Arc<dyn Clock>, users: UserRepo) -> Self {
        let records = RecordStore::new(kv, Collection::Post).with_clock(clock);
        Self {
            threads: records.sibling(Collection::Thread),
            records,
            users,
        }
    }

    /// Posts `body` as `user` in `thread`. Fails with `NotFound` when either
    /// has been deleted since it was loaded.
    pub async fn create(&self, user: &User, thread: &Thread, body: &str) -> Result<WithUser<Post>> {
        self.threads.require(thread.id).await?;
        self.users.records().require(user.id).await?;

        let id = self.records.generate_id().await?;
        let created = self.records.now();
        let post = Post {
            id,
            body: body.to_string(),
            user: user.id,
            thread: thread.id,
            created,
            edited: created,
        };
        self.records.set(id, &post.to_fields()).await?;

        let thread_posts = self.threads.children_key(thread.id, Collection::Post);
        self.threads.add_member(&thread_posts, id).await?;
        self.users.link_post(user.id, id).await?;

        info!(post_id = %id, thread_id = %thread.id, user_id = %user.id, "post created");
        Ok(WithUser {
            record: post,
            user: Some(user.clone()),
        })
    }

    /// The post with its author resolved.
    pub async fn get(&self, id: Id) -> Result<Option<WithUser<Post>>> {
        match self.records.get_as::<Post>(id).await? {
            Some(post) => resolve_user(&self.users, post).await.map(Some),
            None => Ok(None),
        }
    }

    /// Replaces the body and bumps `edited`.
    pub async fn edit(&self, id: Id, update: PostUpdate) -> Result<Option<WithUser<Post>>> {
        if self.records.get(id).await?.is_none() {
            return Ok(None);
        }
        if let Some(body) = update.body {
            let fields = field_map([
                (field::BODY, body),
                (field::EDITED, timestamp_value(self.records.now())),
            ]);
            self.records.edit(id, None, &fields).await?;
        }
        self.get(id).await
    }

    /// Every post, newest first.
    pub async fn all(&self, page: Page) -> Result<Vec<WithUser<Post>>> {
        let posts = self.records.all_page_as(page).await?;
        resolve_users(&self.users, posts).await
    }

    pub async fn by_user(&self, user_id: Id, page: Page) -> Result<Vec<WithUser<Post>>> {
        let ids = self.users.post_ids(user_id, page).await?;
        self.load(&ids).await
    }

    /// Fetches posts by id in order, skipping dangling ids.
    pub async fn load(&self, ids: &[String]) -> Result<Vec<WithUser<Post>>> {
        let posts = self.records.load_many(ids).await?;
        resolve_users(&self.users, posts).await
    }

    /// Unlinks the post from its thread and author, then deletes it.
    /// Returns `false` if it was already absent.
    pub async fn delete(&self, id: Id) -> Result<bool> {
        let Some(post) = self.records.get_as::<Post>(id).await? else {
            return Ok(false);
        };
        let thread_posts = self.threads.children_key(post.thread, Collection::Post);
        self.threads.remove_member(&thread_posts, id).await?;
        self.users.unlink_post(post.user, id).await?;
        self.records.delete(id).await?;
        info!(post_id = %id, thread_id = %post.thread, "post deleted");
        Ok(true)
    }
}
