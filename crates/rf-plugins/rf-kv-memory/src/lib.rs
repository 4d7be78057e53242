//! # rf-kv-memory
//!
//! In-process implementation of `KvStore`.
//! Mirrors the Redis semantics the data layer relies on (hash, sorted set
//! and counter keys, inclusive negative-index ranges), so repositories can
//! be exercised hermetically and single-node deployments need no server.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rf_core::fields::FieldMap;
use rf_core::traits::KvStore;

/// Thread-safe store; each key is locked independently.
#[derive(Default)]
pub struct MemoryStore {
    counters: DashMap<String, i64>,
    hashes: DashMap<String, FieldMap>,
    sets: DashMap<String, SortedSet>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every live key, sorted. Handy for asserting nothing leaked.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .counters
            .iter()
            .map(|entry| entry.key().clone())
            .chain(self.hashes.iter().map(|entry| entry.key().clone()))
            .chain(self.sets.iter().map(|entry| entry.key().clone()))
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.counters.contains_key(key) || self.hashes.contains_key(key) || self.sets.contains_key(key)
    }

    /// Drops every key.
    pub fn flush(&self) {
        self.counters.clear();
        self.hashes.clear();
        self.sets.clear();
    }
}

/// Score-ordered members. Like Redis, equal scores fall back to byte-wise
/// member order, so "10" ranks below "9" in a descending read.
#[derive(Default)]
struct SortedSet {
    members: HashMap<String, i64>,
}

impl SortedSet {
    fn insert(&mut self, member: &str, score: i64) -> bool {
        if self.members.contains_key(member) {
            return false;
        }
        self.members.insert(member.to_string(), score);
        true
    }

    fn descending(&self) -> Vec<&str> {
        let mut ranked: Vec<(&str, i64)> = self
            .members
            .iter()
            .map(|(member, score)| (member.as_str(), *score))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(a.0)));
        ranked.into_iter().map(|(member, _)| member).collect()
    }
}

/// Resolves a Redis-style inclusive range against `len` items.
fn resolve_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = isize::try_from(len).ok()?;
    if len == 0 {
        return None;
    }
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if start > stop || start >= len {
        return None;
    }
    Some((usize::try_from(start).ok()?, usize::try_from(stop).ok()?))
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn incr(&self, key: &str) -> anyhow::Result<i64> {
        let mut counter = self.counters.entry(key.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn hget(&self, key: &str, field: &str) -> anyhow::Result<Option<String>> {
        Ok(self
            .hashes
            .get(key)
            .and_then(|hash| hash.get(field).cloned()))
    }

    async fn hgetall(&self, key: &str) -> anyhow::Result<FieldMap> {
        Ok(self
            .hashes
            .get(key)
            .map(|hash| hash.value().clone())
            .unwrap_or_default())
    }

    async fn hset(&self, key: &str, fields: &FieldMap) -> anyhow::Result<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut hash = self.hashes.entry(key.to_string()).or_default();
        hash.extend(fields.iter().map(|(name, value)| (name.clone(), value.clone())));
        Ok(())
    }

    async fn hset_nx(&self, key: &str, field: &str, value: &str) -> anyhow::Result<bool> {
        let mut hash = self.hashes.entry(key.to_string()).or_default();
        if hash.contains_key(field) {
            return Ok(false);
        }
        hash.insert(field.to_string(), value.to_string());
        Ok(true)
    }

    async fn hdel(&self, key: &str, fields: &[String]) -> anyhow::Result<u64> {
        let Entry::Occupied(mut hash) = self.hashes.entry(key.to_string()) else {
            return Ok(0);
        };
        let removed = fields
            .iter()
            .filter(|field| hash.get_mut().remove(field.as_str()).is_some())
            .count();
        if hash.get().is_empty() {
            hash.remove();
        }
        Ok(removed as u64)
    }

    async fn zadd(&self, key: &str, member: &str, score: i64) -> anyhow::Result<bool> {
        let mut set = self.sets.entry(key.to_string()).or_default();
        Ok(set.insert(member, score))
    }

    async fn zrem(&self, key: &str, member: &str) -> anyhow::Result<bool> {
        let Entry::Occupied(mut set) = self.sets.entry(key.to_string()) else {
            return Ok(false);
        };
        let removed = set.get_mut().members.remove(member).is_some();
        if set.get().members.is_empty() {
            set.remove();
        }
        Ok(removed)
    }

    async fn zrevrange(&self, key: &str, start: isize, stop: isize) -> anyhow::Result<Vec<String>> {
        let Some(set) = self.sets.get(key) else {
            return Ok(Vec::new());
        };
        let ranked = set.descending();
        Ok(match resolve_range(ranked.len(), start, stop) {
            Some((first, last)) => ranked[first..=last].iter().map(|m| m.to_string()).collect(),
            None => Vec::new(),
        })
    }

    async fn zscore(&self, key: &str, member: &str) -> anyhow::Result<Option<i64>> {
        Ok(self
            .sets
            .get(key)
            .and_then(|set| set.members.get(member).copied()))
    }

    async fn del(&self, key: &str) -> anyhow::Result<bool> {
        let counter = self.counters.remove(key).is_some();
        let hash = self.hashes.remove(key).is_some();
        let set = self.sets.remove(key).is_some();
        if counter || hash || set {
            tracing::trace!(key, "key removed");
        }
        Ok(counter || hash || set)
    }
}
