//! # rf-kv-redis Implementation
//!
//! This module maps the `KvStore` port onto Redis commands over a pooled
//! connection. Key layout is owned by rf-core; this crate only speaks the
//! wire commands.
//!
//! # Developer Note
//! Sorted-set members that share a score are ordered lexicographically by
//! Redis, so two records created within the same second page in id-string
//! order rather than strict insertion order. rf-kv-memory breaks ties the
//! same way.

use async_trait::async_trait;
use deadpool_redis::redis::cmd;
use deadpool_redis::{Config, Connection, Pool, PoolConfig, Runtime};
use rf_core::fields::FieldMap;
use rf_core::traits::KvStore;

pub struct RedisStore {
    pool: Pool,
}

impl RedisStore {
    /// Builds a pool of up to `pool_size` connections to `url`
    /// (e.g., "redis://127.0.0.1:6379/0"). Connections open lazily.
    pub fn connect(url: &str, pool_size: usize) -> anyhow::Result<Self> {
        let mut config = Config::from_url(url);
        config.pool = Some(PoolConfig::new(pool_size));
        let pool = config.create_pool(Some(Runtime::Tokio1))?;
        tracing::debug!(pool_size, "redis pool created");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: Pool) -> Self {
        Self { pool }
    }

    /// Round-trips a PING to surface bad URLs or credentials at startup.
    pub async fn ping(&self) -> anyhow::Result<()> {
        let mut conn = self.conn().await?;
        let _: String = cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    async fn conn(&self) -> anyhow::Result<Connection> {
        Ok(self.pool.get().await?)
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn incr(&self, key: &str) -> anyhow::Result<i64> {
        let mut conn = self.conn().await?;
        let value: i64 = cmd("INCR").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn hget(&self, key: &str, field: &str) -> anyhow::Result<Option<String>> {
        let mut conn = self.conn().await?;
        let value: Option<String> = cmd("HGET").arg(key).arg(field).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn hgetall(&self, key: &str) -> anyhow::Result<FieldMap> {
        let mut conn = self.conn().await?;
        let fields: FieldMap = cmd("HGETALL").arg(key).query_async(&mut conn).await?;
        Ok(fields)
    }

    async fn hset(&self, key: &str, fields: &FieldMap) -> anyhow::Result<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let mut command = cmd("HSET");
        command.arg(key);
        for (name, value) in fields {
            command.arg(name).arg(value);
        }
        let mut conn = self.conn().await?;
        let _: i64 = command.query_async(&mut conn).await?;
        Ok(())
    }

    async fn hset_nx(&self, key: &str, field: &str, value: &str) -> anyhow::Result<bool> {
        let mut conn = self.conn().await?;
        let written: bool = cmd("HSETNX")
            .arg(key)
            .arg(field)
            .arg(value)
            .query_async(&mut conn)
            .await?;
        Ok(written)
    }

    async fn hdel(&self, key: &str, fields: &[String]) -> anyhow::Result<u64> {
        if fields.is_empty() {
            return Ok(0);
        }
        let mut conn = self.conn().await?;
        let removed: u64 = cmd("HDEL").arg(key).arg(fields).query_async(&mut conn).await?;
        Ok(removed)
    }

    async fn zadd(&self, key: &str, member: &str, score: i64) -> anyhow::Result<bool> {
        let mut conn = self.conn().await?;
        let added: i64 = cmd("ZADD")
            .arg(key)
            .arg("NX")
            .arg(score)
            .arg(member)
            .query_async(&mut conn)
            .await?;
        Ok(added > 0)
    }

    async fn zrem(&self, key: &str, member: &str) -> anyhow::Result<bool> {
        let mut conn = self.conn().await?;
        let removed: i64 = cmd("ZREM").arg(key).arg(member).query_async(&mut conn).await?;
        Ok(removed > 0)
    }

    async fn zrevrange(&self, key: &str, start: isize, stop: isize) -> anyhow::Result<Vec<String>> {
        let mut conn = self.conn().await?;
        let members: Vec<String> = cmd("ZREVRANGE")
            .arg(key)
            .arg(start)
            .arg(stop)
            .query_async(&mut conn)
            .await?;
        Ok(members)
    }

    async fn zscore(&self, key: &str, member: &str) -> anyhow::Result<Option<i64>> {
        let mut conn = self.conn().await?;
        let score: Option<f64> = cmd("ZSCORE").arg(key).arg(member).query_async(&mut conn).await?;
        Ok(score.map(|score| score as i64))
    }

    async fn del(&self, key: &str) -> anyhow::Result<bool> {
        let mut conn = self.conn().await?;
        let removed: i64 = cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_store() -> RedisStore {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379/15".into());
        RedisStore::connect(&url, 4).expect("Failed to build redis pool")
    }

    #[tokio::test]
    #[ignore = "requires a running redis (set REDIS_URL)"]
    async fn test_hash_and_index_commands() {
        let store = live_store();
        store.ping().await.unwrap();
        store.del("rf-test:hash").await.unwrap();
        store.del("rf-test:index").await.unwrap();

        let fields = FieldMap::from([("title".to_string(), "General".to_string())]);
        store.hset("rf-test:hash", &fields).await.unwrap();
        assert_eq!(store.hgetall("rf-test:hash").await.unwrap(), fields);

        assert!(store.hset_nx("rf-test:index", "General", "1").await.unwrap());
        assert!(!store.hset_nx("rf-test:index", "General", "2").await.unwrap());
        assert_eq!(store.hdel("rf-test:index", &["General".to_string()]).await.unwrap(), 1);

        assert!(store.del("rf-test:hash").await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires a running redis (set REDIS_URL)"]
    async fn test_sorted_set_commands() {
        let store = live_store();
        store.del("rf-test:set").await.unwrap();

        assert!(store.zadd("rf-test:set", "a", 1).await.unwrap());
        assert!(store.zadd("rf-test:set", "b", 2).await.unwrap());
        assert!(!store.zadd("rf-test:set", "a", 5).await.unwrap());
        assert_eq!(store.zscore("rf-test:set", "a").await.unwrap(), Some(1));
        assert_eq!(store.zrevrange("rf-test:set", 0, -1).await.unwrap(), vec!["b", "a"]);

        assert!(store.zrem("rf-test:set", "a").await.unwrap());
        assert!(store.del("rf-test:set").await.unwrap());
    }
}
