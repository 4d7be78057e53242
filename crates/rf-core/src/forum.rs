//! # Forum
//!
//! Wires every repository onto one injected store. Nothing here is global:
//! tests build a `Forum` over an in-memory store, the binary over Redis.

use std::sync::Arc;

use crate::fields::SystemClock;
use crate::repos::{CategoryRepo, PostRepo, SessionRepo, SubRepo, ThreadRepo, UserRepo};
use crate::traits::{Clock, KvStore, PasswordHasher, TokenSource};

/// All repositories sharing one store.
#[derive(Clone)]
pub struct Forum {
    pub users: UserRepo,
    pub sessions: SessionRepo,
    pub categories: CategoryRepo,
    pub subs: SubRepo,
    pub threads: ThreadRepo,
    pub posts: PostRepo,
}

impl Forum {
    pub fn new(
        kv: Arc<dyn KvStore>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self::with_clock(kv, hasher, tokens, Arc::new(SystemClock))
    }

    /// Like [`Forum::new`], with `clock` stamping records and ordering sets.
    pub fn with_clock(
        kv: Arc<dyn KvStore>,
        hasher: Arc<dyn PasswordHasher>,
        tokens: Arc<dyn TokenSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let users = UserRepo::new(kv.clone(), clock.clone(), hasher);
        let posts = PostRepo::new(kv.clone(), clock.clone(), users.clone());
        let threads = ThreadRepo::new(kv.clone(), clock.clone(), users.clone(), posts.clone());
        let subs = SubRepo::new(kv.clone(), clock.clone(), threads.clone());
        let categories = CategoryRepo::new(kv.clone(), clock.clone(), subs.clone());
        let sessions = SessionRepo::new(kv, clock, users.clone(), tokens);
        Self {
            users,
            sessions,
            categories,
            subs,
            threads,
            posts,
        }
    }
}
