//! # Entity Repositories
//!
//! Each repository wraps a [`RecordStore`](crate::store::RecordStore) for its
//! own collection and adds the rules only it knows: which field is unique,
//! which parent sets a record joins, and what a delete must clean up.
//!
//! Deletes cascade downward (category → subs → threads → posts). Deleting a
//! user leaves their threads and posts in place; reads resolve the missing
//! author to `None`.

mod category;
mod post;
mod session;
mod sub;
mod thread;
mod user;

use std::collections::HashMap;

pub use category::CategoryRepo;
pub use post::{PostRepo, PostUpdate};
pub use session::SessionRepo;
pub use sub::{SubRepo, SubUpdate};
pub use thread::{ThreadRepo, ThreadUpdate};
pub use user::{UserRepo, UserUpdate};

use tracing::warn;

use crate::error::Result;
use crate::keys::Collection;
use crate::models::{Id, Post, Session, Thread, User, WithUser};

/// Records that reference their owning user by id.
pub(crate) trait OwnedByUser {
    fn user_id(&self) -> Id;
}

impl OwnedByUser for Thread {
    fn user_id(&self) -> Id {
        self.user
    }
}

impl OwnedByUser for Post {
    fn user_id(&self) -> Id {
        self.user
    }
}

impl OwnedByUser for Session {
    fn user_id(&self) -> Id {
        self.user
    }
}

/// Resolves each record's user, fetching every distinct user once.
pub(crate) async fn resolve_users<T: OwnedByUser>(
    users: &UserRepo,
    records: Vec<T>,
) -> Result<Vec<WithUser<T>>> {
    let mut cache: HashMap<Id, Option<User>> = HashMap::new();
    let mut resolved = Vec::with_capacity(records.len());
    for record in records {
        let user_id = record.user_id();
        let user = match cache.get(&user_id) {
            Some(user) => user.clone(),
            None => {
                let user = users.get(user_id).await?;
                cache.insert(user_id, user.clone());
                user
            }
        };
        resolved.push(WithUser { record, user });
    }
    Ok(resolved)
}

pub(crate) async fn resolve_user<T: OwnedByUser>(
    users: &UserRepo,
    record: T,
) -> Result<WithUser<T>> {
    let user = users.get(record.user_id()).await?;
    Ok(WithUser { record, user })
}

/// Parses relationship-set members, skipping any that are not ids.
pub(crate) fn parse_ids(collection: Collection, members: &[String]) -> Vec<Id> {
    members
        .iter()
        .filter_map(|member| match member.parse() {
            Ok(id) => Some(id),
            Err(_) => {
                warn!(%collection, %member, "skipping malformed member id");
                None
            }
        })
        .collect()
}
