//! Memo Cache demo
//!
//! Wires a cache from environment configuration and memoizes a slow
//! computation, logging hits, misses and eviction.

use std::time::{Duration, Instant};

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memo_cache::{evict_then, CacheFactory, Config, Memoize};

/// Stand-in for an expensive upstream call.
async fn slow_square(n: u64) -> u64 {
    tokio::time::sleep(Duration::from_millis(200)).await;
    n * n
}

/// Entry point for the demo.
///
/// # Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the cache through the factory
/// 4. Call a memoized computation twice per argument
/// 5. Invalidate every argument variant with a wildcard evict
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memo_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        "Configuration loaded: namespace={}, max_entries={}, default_ttl={}s, storage={:?}",
        config.namespace, config.max_entries, config.default_ttl, config.storage_path
    );

    let cache = CacheFactory::from_config(&config).create();

    for n in [3u64, 4, 3, 4] {
        let started = Instant::now();
        let value = Memoize::new(&cache, "square", config.default_ttl)
            .arg(&n)?
            .get_or_compute(|| slow_square(n))
            .await
            .with_context(|| format!("memoized square({})", n))?;
        info!("square({}) = {} in {:?}", n, value, started.elapsed());
    }

    evict_then(&cache, "square:*", || async {
        info!("Upstream data changed, cached squares invalidated");
    })
    .await?;

    let stats = cache.stats();
    info!(
        "Stats: hits={}, misses={}, writes={}, evictions={}, hit_rate={:.2}",
        stats.hits,
        stats.misses,
        stats.writes,
        stats.evictions,
        stats.hit_rate()
    );

    Ok(())
}
