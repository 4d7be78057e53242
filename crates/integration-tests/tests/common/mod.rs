//! Shared fixtures: a forum over a fresh in-memory store with a cheap,
//! deterministic hasher, token source and clock.
#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rf_core::{Category, Clock, Forum, PasswordHasher, SessionToken, Sub, TokenSource, User};
use rf_kv_memory::MemoryStore;

/// Reversible "hash" so tests can assert the plaintext never lands in the store.
pub struct PlainHasher;

impl PasswordHasher for PlainHasher {
    fn hash(&self, plaintext: &str) -> anyhow::Result<String> {
        Ok(format!("plain${plaintext}"))
    }

    fn verify(&self, hash: &str, plaintext: &str) -> bool {
        hash.strip_prefix("plain$") == Some(plaintext)
    }
}

#[derive(Default)]
pub struct CountingTokens {
    next: AtomicU64,
}

impl TokenSource for CountingTokens {
    fn generate(&self) -> anyhow::Result<SessionToken> {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SessionToken::new(format!("{n:0>28}")))
    }
}

/// Advances one second per reading, so every set member gets its own score.
pub struct TickingClock {
    next: AtomicI64,
}

impl TickingClock {
    pub fn starting_at(secs: i64) -> Self {
        Self {
            next: AtomicI64::new(secs),
        }
    }
}

impl Default for TickingClock {
    fn default() -> Self {
        Self::starting_at(1_700_000_000)
    }
}

impl Clock for TickingClock {
    fn now(&self) -> DateTime<Utc> {
        let secs = self.next.fetch_add(1, Ordering::SeqCst);
        DateTime::from_timestamp(secs, 0).unwrap_or_default()
    }
}

pub fn forum() -> (Forum, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let forum = Forum::with_clock(
        store.clone(),
        Arc::new(PlainHasher),
        Arc::new(CountingTokens::default()),
        Arc::new(TickingClock::default()),
    );
    (forum, store)
}

/// Category "General" with sub "Intro" and user "alice".
pub async fn board(forum: &Forum) -> (Category, Sub, User) {
    let general = forum.categories.create("General").await.unwrap();
    let intro = forum
        .categories
        .create_sub(&general, "Intro", "Say hello")
        .await
        .unwrap();
    let alice = forum.users.create("alice", "pw").await.unwrap();
    (general, intro, alice)
}
