//! [`ResourceCache`]: keyed storage of server state.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, warn};
use trailguard_core::{ApiError, CacheKey, KeyTree};

use super::entry::{lock, Entry};
use super::poll::PollHandle;
use super::query::{Query, QueryOptions};
use super::Fetcher;

/// Upper bound of the retry back-off.
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Tuning knobs of the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long a stored value counts as fresh.  Zero means every new
    /// subscriber triggers a refetch (unless one is already running).
    pub stale_time: Duration,
    /// How long an unobserved value is kept before
    /// [`ResourceCache::prune_inactive`] may drop it.
    pub gc_time: Duration,
    /// Retries after the first failed attempt, for queries that allow it.
    pub retry_attempts: u32,
    /// Delay before the first retry; doubles on each further attempt.
    pub retry_base_delay: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::ZERO,
            gc_time: Duration::from_secs(300),
            retry_attempts: 3,
            retry_base_delay: Duration::from_millis(1000),
        }
    }
}

impl CacheConfig {
    /// Back-off before retry number `attempt + 1`.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        self.retry_base_delay
            .saturating_mul(1u32 << attempt.min(16))
            .min(MAX_RETRY_DELAY)
    }
}

struct Inner {
    entries: Mutex<KeyTree<Arc<Entry>>>,
    config: CacheConfig,
}

/// Client-side cache of server state.
///
/// `ResourceCache` is a cheap handle: clones share the same entries.  Create
/// one at the application root and pass it to every hook that needs it.
///
/// All methods that may start a fetch spawn onto the current Tokio runtime
/// and must be called from within one.
#[derive(Clone)]
pub struct ResourceCache {
    inner: Arc<Inner>,
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl fmt::Debug for ResourceCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceCache")
            .field("entries", &self.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl ResourceCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(KeyTree::new()),
                config,
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        lock(&self.inner.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribes to `key`.
    ///
    /// `fetcher` becomes the loader of the key (the most recent registration
    /// wins).  When `options.enabled` is set the query counts as an observer,
    /// a fetch starts if the stored value is stale or missing, and, with a
    /// `refetch_interval`, a poll task keeps refetching until the returned
    /// [`Query`] is dropped.  A disabled query never touches the network.
    pub fn subscribe<T: DeserializeOwned>(
        &self,
        key: CacheKey,
        fetcher: Fetcher,
        options: QueryOptions,
    ) -> Query<T> {
        let entry = {
            let mut entries = lock(&self.inner.entries);
            Arc::clone(entries.get_or_insert_with(&key, || Arc::new(Entry::new())))
        };

        let start = {
            let mut control = entry.control();
            control.fetcher = Some(fetcher);
            if options.on_success.is_some() {
                control.on_success = options.on_success.clone();
            }
            control.retry = options.retry;
            if options.enabled {
                control.observers += 1;
                let stale = entry.state.borrow().is_stale(self.inner.config.stale_time);
                stale && control.try_begin()
            } else {
                false
            }
        };
        if start {
            self.begin_fetch(key.clone(), Arc::clone(&entry));
        } else {
            debug!(%key, enabled = options.enabled, "subscribed without fetching");
        }

        let poll = match (options.enabled, options.refetch_interval) {
            (true, Some(every)) if !every.is_zero() => {
                Some(PollHandle::spawn(self.clone(), key.clone(), every))
            }
            _ => None,
        };
        Query::new(self.clone(), key, entry, options.enabled, poll)
    }

    /// Marks every entry under `prefix` stale.
    ///
    /// Observed entries refetch right away; when a fetch for one of them is
    /// already running, exactly one follow-up fetch is queued behind it.
    /// Unobserved entries refetch on their next subscription.  Returns the
    /// number of entries matched.
    pub fn invalidate(&self, prefix: &CacheKey) -> usize {
        let matched: Vec<(CacheKey, Arc<Entry>)> = lock(&self.inner.entries)
            .descendants(prefix)
            .into_iter()
            .map(|(key, entry)| (key, Arc::clone(entry)))
            .collect();

        for (key, entry) in &matched {
            let start = {
                let mut control = entry.control();
                entry.state.send_modify(|s| s.is_stale = true);
                if control.observers == 0 {
                    false
                } else if control.in_flight {
                    control.refetch_queued = true;
                    false
                } else {
                    control.try_begin()
                }
            };
            if start {
                self.begin_fetch(key.clone(), Arc::clone(entry));
            }
        }

        debug!(%prefix, matched = matched.len(), "invalidated");
        matched.len()
    }

    /// Starts a fetch of `key` unless one is already running.
    ///
    /// Returns `true` when a new fetch was started.
    pub fn refetch(&self, key: &CacheKey) -> bool {
        let Some(entry) = lock(&self.inner.entries).get(key).cloned() else {
            return false;
        };
        let start = entry.control().try_begin();
        if start {
            self.begin_fetch(key.clone(), entry);
        }
        start
    }

    /// Runs `write`, then invalidates each prefix in `invalidates`.
    ///
    /// Nothing is invalidated when the write fails.  Writes are never
    /// retried.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `write`.
    pub async fn mutate<T, F>(&self, write: F, invalidates: &[CacheKey]) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let value = write.await?;
        for prefix in invalidates {
            self.invalidate(prefix);
        }
        Ok(value)
    }

    /// The value stored under `key`, decoded as `T`.
    pub fn peek<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let entry = lock(&self.inner.entries).get(key).cloned()?;
        let data = entry.state.borrow().data.clone()?;
        <T as Deserialize>::deserialize(data.as_ref()).ok()
    }

    /// Drops entries nobody observes, with no fetch running, whose value is
    /// older than `gc_time` (or which never stored one).
    ///
    /// Returns the number of entries removed.
    pub fn prune_inactive(&self) -> usize {
        let gc_time = self.inner.config.gc_time;
        let removed = lock(&self.inner.entries).retain(|_, entry| {
            let control = entry.control();
            if control.observers > 0 || control.in_flight {
                return true;
            }
            let updated_at = entry.state.borrow().updated_at;
            updated_at.is_some_and(|stored| stored.elapsed() < gc_time)
        });
        if removed > 0 {
            debug!(removed, "pruned inactive cache entries");
        }
        removed
    }

    /// Drops every entry.  Live queries keep their last snapshot but are no
    /// longer reachable by invalidation.
    pub fn clear(&self) {
        lock(&self.inner.entries).clear();
    }

    /// Called when an enabled [`Query`] goes away.
    pub(crate) fn release(&self, entry: &Entry) {
        let mut control = entry.control();
        control.observers = control.observers.saturating_sub(1);
    }

    /// Publishes `is_fetching` and spawns the fetch.  The caller must have
    /// claimed the slot with `Control::try_begin`.
    fn begin_fetch(&self, key: CacheKey, entry: Arc<Entry>) {
        entry.state.send_modify(|s| s.is_fetching = true);
        debug!(%key, "fetch started");
        let cache = self.clone();
        tokio::spawn(async move { cache.run_fetch(key, entry).await });
    }

    async fn run_fetch(self, key: CacheKey, entry: Arc<Entry>) {
        loop {
            let (fetcher, retry) = {
                let control = entry.control();
                (control.fetcher.clone(), control.retry)
            };
            let Some(fetcher) = fetcher else {
                entry.control().in_flight = false;
                entry.state.send_modify(|s| s.is_fetching = false);
                return;
            };

            let outcome = self.fetch_with_retry(&key, &fetcher, retry).await.map(Arc::new);

            // Store under the control lock so an invalidation either sees the
            // fetch as running (and queues) or as finished (and starts anew).
            let (again, hook, previous) = {
                let mut control = entry.control();
                let queued = control.refetch_queued;
                let again = queued && control.observers > 0;
                control.refetch_queued = false;
                control.in_flight = again;

                let mut previous = None;
                entry.state.send_modify(|s| {
                    s.is_fetching = again;
                    match &outcome {
                        Ok(value) => {
                            previous = s.data.replace(Arc::clone(value));
                            s.error = None;
                            s.is_stale = queued;
                            s.updated_at = Some(Instant::now());
                        }
                        Err(err) => s.error = Some(err.clone()),
                    }
                });
                (again, control.on_success.clone(), previous)
            };

            match &outcome {
                Ok(value) => {
                    debug!(%key, "fetch stored");
                    if let Some(hook) = hook {
                        hook(&self, previous.as_deref(), value);
                    }
                }
                Err(err) => warn!(%key, error = %err, "fetch failed"),
            }

            if !again {
                return;
            }
            debug!(%key, "refetching after invalidation during fetch");
        }
    }

    async fn fetch_with_retry(
        &self,
        key: &CacheKey,
        fetcher: &Fetcher,
        retry: bool,
    ) -> Result<serde_json::Value, ApiError> {
        let config = &self.inner.config;
        let mut attempt = 0;
        loop {
            match fetcher().await {
                Err(err) if retry && err.is_retryable() && attempt < config.retry_attempts => {
                    let delay = config.retry_delay(attempt);
                    attempt += 1;
                    warn!(%key, attempt, error = %err, "fetch failed, retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                }
                outcome => return outcome,
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
