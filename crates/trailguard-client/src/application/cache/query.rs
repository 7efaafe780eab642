//! Read side of the cache: [`Query`] and its options.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::watch;
use trailguard_core::{ApiError, CacheKey};

use super::entry::{Entry, Snapshot};
use super::poll::PollHandle;
use super::store::ResourceCache;
use super::SuccessHook;

/// How a subscription behaves.
#[derive(Clone)]
pub struct QueryOptions {
    /// A disabled query registers its fetcher but never fetches or polls.
    pub enabled: bool,
    /// Refetch on this interval while the query is alive.  A zero interval
    /// means no polling.
    pub refetch_interval: Option<Duration>,
    /// Retry retryable failures per [`CacheConfig`](super::CacheConfig).
    pub retry: bool,
    /// Called after each successful fetch is stored.
    pub on_success: Option<SuccessHook>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            refetch_interval: None,
            retry: true,
            on_success: None,
        }
    }
}

impl fmt::Debug for QueryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryOptions")
            .field("enabled", &self.enabled)
            .field("refetch_interval", &self.refetch_interval)
            .field("retry", &self.retry)
            .field("on_success", &self.on_success.is_some())
            .finish()
    }
}

impl QueryOptions {
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn refetch_interval(mut self, every: Duration) -> Self {
        self.refetch_interval = Some(every);
        self
    }

    #[must_use]
    pub fn retry(mut self, retry: bool) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn on_success(mut self, hook: SuccessHook) -> Self {
        self.on_success = Some(hook);
        self
    }
}

/// Read state of one query, decoded as `T`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    /// Last successfully fetched value.  Kept while refetching and after a
    /// failed refetch.
    pub data: Option<T>,
    /// Error of the most recent fetch, cleared by the next success.
    pub error: Option<ApiError>,
    /// A fetch is running and nothing has ever been stored.
    pub is_loading: bool,
    /// A fetch is running.
    pub is_fetching: bool,
    pub is_stale: bool,
}

impl<T> QueryState<T> {
    /// `true` once data is available and the last fetch did not fail.
    pub fn is_success(&self) -> bool {
        self.data.is_some() && self.error.is_none()
    }
}

/// A live subscription to one cache key.
///
/// While an enabled query is alive it counts as an observer of its key, so
/// invalidation refetches the key.  Dropping the query cancels its polling.
pub struct Query<T> {
    cache: ResourceCache,
    key: CacheKey,
    entry: Arc<Entry>,
    rx: watch::Receiver<Snapshot>,
    enabled: bool,
    poll: Option<PollHandle>,
    _decode: PhantomData<fn() -> T>,
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("key", &self.key)
            .field("enabled", &self.enabled)
            .field("polling", &self.poll.is_some())
            .finish()
    }
}

impl<T: DeserializeOwned> Query<T> {
    pub(crate) fn new(
        cache: ResourceCache,
        key: CacheKey,
        entry: Arc<Entry>,
        enabled: bool,
        poll: Option<PollHandle>,
    ) -> Self {
        let rx = entry.state.subscribe();
        Self {
            cache,
            key,
            entry,
            rx,
            enabled,
            poll,
            _decode: PhantomData,
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The interval poller, when the query was created with one.
    pub fn poll_handle(&self) -> Option<&PollHandle> {
        self.poll.as_ref()
    }

    /// Current state.
    pub fn state(&self) -> QueryState<T> {
        let snapshot = self.rx.borrow();
        self.decode(&snapshot)
    }

    /// Waits for the next state change and returns the new state.
    pub async fn changed(&mut self) -> QueryState<T> {
        // The entry, and with it the sender, lives as long as `self`.
        let _ = self.rx.changed().await;
        let snapshot = self.rx.borrow_and_update().clone();
        self.decode(&snapshot)
    }

    /// Waits until no fetch is running and the entry holds data or an error.
    ///
    /// Returns immediately for a disabled query.
    pub async fn wait_settled(&mut self) -> QueryState<T> {
        if self.enabled {
            let _ = self
                .rx
                .wait_for(|s| !s.is_fetching && (s.data.is_some() || s.error.is_some()))
                .await;
        }
        self.state()
    }

    /// Starts a fetch now unless one is running.  No-op for a disabled query.
    pub fn refetch(&self) -> bool {
        self.enabled && self.cache.refetch(&self.key)
    }

    fn decode(&self, snapshot: &Snapshot) -> QueryState<T> {
        let (data, decode_error) = match snapshot.data.as_deref() {
            Some(value) => match <T as Deserialize>::deserialize(value) {
                Ok(data) => (Some(data), None),
                Err(err) => (None, Some(ApiError::from(err))),
            },
            None => (None, None),
        };
        QueryState {
            data,
            error: snapshot.error.clone().or(decode_error),
            is_loading: snapshot.is_fetching && snapshot.data.is_none(),
            is_fetching: snapshot.is_fetching,
            is_stale: snapshot.is_stale(self.cache.config().stale_time),
        }
    }
}

impl<T> Drop for Query<T> {
    fn drop(&mut self) {
        if let Some(poll) = &self.poll {
            poll.cancel();
        }
        if self.enabled {
            self.cache.release(&self.entry);
        }
    }
}
