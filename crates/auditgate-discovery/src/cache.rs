//! # Probe Cache
//!
//! Memoized probe results keyed by (probe kind, target), with a freshness
//! window.
//!
//! Concurrent lookups of the same key share one in-flight probe: the first
//! caller runs it, later callers wait on the same cell. Only successful
//! probes are stored; a failed one leaves the slot empty so the next lookup
//! tries again. Entries older than the TTL are replaced on the next lookup.
//! Nothing here is persisted.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::Instant;

/// Which probe produced a cached result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    /// CNAME lookup of one fully qualified name.
    DnsAlias,
    /// MX lookup of a domain.
    DnsMx,
    /// HTTP health check of one endpoint URL.
    Api,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: ProbeKind,
    pub target: String,
}

impl CacheKey {
    #[must_use]
    pub fn new(kind: ProbeKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
        }
    }
}

type Slot<V> = Arc<OnceCell<(Instant, V)>>;

/// Shared, TTL-bounded cache of probe results.
#[derive(Debug)]
pub struct ProbeCache<V> {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, Slot<V>>>,
}

impl<V: Clone> ProbeCache<V> {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the fresh cached value for `key`, or run `probe` to produce it.
    ///
    /// At most one `probe` runs per key at a time. An `Err` from `probe` is
    /// handed back to the caller and not stored.
    pub async fn get_or_probe<F, Fut, E>(&self, key: CacheKey, probe: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.slot(key);
        let (_, value) = slot
            .get_or_try_init(|| async move {
                let value = probe().await?;
                Ok((Instant::now(), value))
            })
            .await?;
        Ok(value.clone())
    }

    /// Number of entries, fresh or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop entries whose value has outlived the TTL, and empty slots that
    /// no lookup is waiting on.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        let ttl = self.ttl;
        self.lock().retain(|_, slot| match slot.get() {
            Some((at, _)) => now.duration_since(*at) < ttl,
            None => Arc::strong_count(slot) > 1,
        });
    }

    fn slot(&self, key: CacheKey) -> Slot<V> {
        let now = Instant::now();
        let mut entries = self.lock();
        let reusable = entries.get(&key).filter(|slot| match slot.get() {
            Some((at, _)) => now.duration_since(*at) < self.ttl,
            // In flight, or left empty by a failed probe.
            None => true,
        });
        if let Some(slot) = reusable {
            return Arc::clone(slot);
        }
        let slot: Slot<V> = Arc::new(OnceCell::new());
        entries.insert(key, Arc::clone(&slot));
        slot
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, Slot<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    async fn fixed<V: Clone>(cache: &ProbeCache<V>, key: CacheKey, value: V) -> V {
        match cache
            .get_or_probe(key, || async move { Ok::<_, Infallible>(value) })
            .await
        {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_lookups_share_one_probe() {
        let cache = ProbeCache::new(DAY);
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let probe = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, Infallible>(vec!["acme.zoom.us".to_string()])
        };

        let key = CacheKey::new(ProbeKind::DnsAlias, "zoom.acme.com");
        let (a, b, c) = tokio::join!(
            cache.get_or_probe(key.clone(), probe),
            cache.get_or_probe(key.clone(), probe),
            cache.get_or_probe(key.clone(), probe),
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_entries_are_reused_and_stale_ones_refreshed() {
        let cache = ProbeCache::new(DAY);
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let probe = move || async move { Ok::<_, Infallible>(counter.fetch_add(1, Ordering::SeqCst)) };
        let key = CacheKey::new(ProbeKind::Api, "https://slack.com/api/auth.test");

        assert_eq!(cache.get_or_probe(key.clone(), probe).await, Ok(0));
        tokio::time::advance(Duration::from_secs(60 * 60)).await;
        assert_eq!(cache.get_or_probe(key.clone(), probe).await, Ok(0));

        tokio::time::advance(DAY).await;
        assert_eq!(cache.get_or_probe(key, probe).await, Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_probes_are_retried() {
        let cache = ProbeCache::new(DAY);
        let key = CacheKey::new(ProbeKind::DnsMx, "acme.com");

        let failed = cache
            .get_or_probe(key.clone(), || async { Err::<u32, _>("SERVFAIL") })
            .await;
        assert_eq!(failed, Err("SERVFAIL"));

        let retried = cache
            .get_or_probe(key.clone(), || async { Ok::<_, &str>(7) })
            .await;
        assert_eq!(retried, Ok(7));
        let cached = cache
            .get_or_probe(key, || async { Ok::<_, &str>(8) })
            .await;
        assert_eq!(cached, Ok(7));
    }

    #[tokio::test(start_paused = true)]
    async fn kinds_do_not_collide() {
        let cache = ProbeCache::new(DAY);
        let alias = fixed(&cache, CacheKey::new(ProbeKind::DnsAlias, "acme.com"), 1).await;
        let mx = fixed(&cache, CacheKey::new(ProbeKind::DnsMx, "acme.com"), 2).await;
        assert_eq!((alias, mx), (1, 2));
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn purge_drops_expired_and_failed_entries() {
        let cache = ProbeCache::new(Duration::from_secs(10));
        fixed(&cache, CacheKey::new(ProbeKind::Api, "old"), 1).await;
        tokio::time::advance(Duration::from_secs(8)).await;
        fixed(&cache, CacheKey::new(ProbeKind::Api, "new"), 2).await;
        let _ = cache
            .get_or_probe(CacheKey::new(ProbeKind::Api, "down"), || async {
                Err::<u32, _>("refused")
            })
            .await;
        assert_eq!(cache.len(), 3);
        tokio::time::advance(Duration::from_secs(5)).await;

        cache.purge_expired();
        assert_eq!(cache.len(), 1);
        assert_eq!(fixed(&cache, CacheKey::new(ProbeKind::Api, "new"), 9).await, 2);
    }
}
