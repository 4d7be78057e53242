//! # Rusty-Forum Binary
//!
//! Assembles the data layer from compile-time features and runtime settings,
//! seeds first-run data (admin account, categories) and reports the board.
//! Seeding is idempotent: existing records are kept.

use std::sync::Arc;

use anyhow::{anyhow, Context};
use rf_config::{LogSettings, SeedSettings, Settings, StoreBackend, StoreSettings};
use rf_core::{Forum, KvStore, Page};
use secrecy::ExposeSecret;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Feature-gated imports
#[cfg(feature = "kv-memory")]
use rf_kv_memory::MemoryStore;

#[cfg(feature = "kv-redis")]
use rf_kv_redis::RedisStore;

#[cfg(feature = "auth-simple")]
use rf_auth_simple::{Argon2Hasher, RandomTokenSource};

#[cfg(not(feature = "auth-simple"))]
compile_error!("rusty-forum needs a password hasher; enable the `auth-simple` feature");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_tracing(&settings.log);

    // 1. Initialize Store Implementation
    let kv = build_store(&settings.store).await?;

    // 2. Initialize Auth Implementation
    let hasher = Arc::new(Argon2Hasher::new());
    let tokens = Arc::new(RandomTokenSource::new(settings.session.token_bytes)?);

    // 3. Wire the repositories
    let forum = Forum::new(kv, hasher, tokens);

    seed(&forum, &settings.seed).await?;
    report(&forum, Page::first(settings.pagination.page_size)).await?;
    Ok(())
}

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let registry = tracing_subscriber::registry().with(filter);
    if log.json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

async fn build_store(store: &StoreSettings) -> anyhow::Result<Arc<dyn KvStore>> {
    match store.backend {
        #[cfg(feature = "kv-memory")]
        StoreBackend::Memory => {
            tracing::warn!("using the in-memory store; data is lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
        #[cfg(feature = "kv-redis")]
        StoreBackend::Redis => {
            let url = store
                .redis_url
                .as_ref()
                .ok_or_else(|| anyhow!("store.redis_url is not set"))?;
            let redis = RedisStore::connect(url.expose_secret(), store.pool_size)?;
            redis.ping().await.context("redis is unreachable")?;
            tracing::info!(pool_size = store.pool_size, "connected to redis");
            Ok(Arc::new(redis))
        }
        #[allow(unreachable_patterns)]
        backend => Err(anyhow!("store backend {backend:?} was not compiled in")),
    }
}

async fn seed(forum: &Forum, seed: &SeedSettings) -> anyhow::Result<()> {
    if let (Some(username), Some(password)) = (&seed.admin_username, &seed.admin_password) {
        let admin = match forum.users.create(username, password.expose_secret()).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, %username, "admin account created");
                user
            }
            Err(e) if e.is_already_exists() => forum
                .users
                .by_username(username)
                .await?
                .ok_or_else(|| anyhow!("admin `{username}` vanished while seeding"))?,
            Err(e) => return Err(e.into()),
        };
        if !admin.is_admin {
            forum.users.set_admin(admin.id, true).await?;
            tracing::info!(user_id = %admin.id, "admin flag granted");
        }
    }

    for title in &seed.categories {
        match forum.categories.create(title).await {
            Ok(category) => tracing::info!(category_id = %category.id, %title, "category seeded"),
            Err(e) if e.is_already_exists() => tracing::debug!(%title, "category already present"),
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Logs the board index: every category, its subs and their latest threads.
async fn report(forum: &Forum, page: Page) -> anyhow::Result<()> {
    let index = forum.categories.with_subs().await?;
    tracing::info!(categories = index.len(), "forum ready");
    for (category, subs) in &index {
        tracing::info!(category = %category.title, subs = subs.len());
        for sub in subs {
            let latest = forum.subs.get_threads(sub.id, page).await?;
            tracing::info!(
                category = %category.title,
                sub = %sub.title,
                latest_threads = latest.len()
            );
        }
    }
    Ok(())
}
