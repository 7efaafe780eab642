//! Per-key cache state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use trailguard_core::ApiError;

use super::{Fetcher, SuccessHook};

/// What observers of one key can see.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    pub data: Option<Arc<serde_json::Value>>,
    pub error: Option<ApiError>,
    pub is_fetching: bool,
    /// Set by invalidation, cleared by the next successful fetch.
    pub is_stale: bool,
    /// When `data` was last stored.
    pub updated_at: Option<Instant>,
}

impl Snapshot {
    /// `true` when the stored value should be refetched by a new subscriber:
    /// it was invalidated, never loaded, or is older than `stale_time`.
    pub fn is_stale(&self, stale_time: Duration) -> bool {
        self.is_stale
            || self
                .updated_at
                .map_or(true, |stored| stored.elapsed() >= stale_time)
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            is_fetching: false,
            is_stale: true,
            updated_at: None,
        }
    }
}

/// Bookkeeping that decides when to fetch.  Never held across an `.await`.
#[derive(Default)]
pub(crate) struct Control {
    pub fetcher: Option<Fetcher>,
    pub on_success: Option<SuccessHook>,
    pub retry: bool,
    pub in_flight: bool,
    /// An invalidation arrived while a fetch was in flight.
    pub refetch_queued: bool,
    /// Number of live, enabled queries on this key.
    pub observers: usize,
}

impl Control {
    /// Claims the fetch slot.  Returns `false` when a fetch is already in
    /// flight or no fetcher has been registered.
    pub fn try_begin(&mut self) -> bool {
        if self.in_flight || self.fetcher.is_none() {
            return false;
        }
        self.in_flight = true;
        true
    }
}

pub(crate) struct Entry {
    pub state: watch::Sender<Snapshot>,
    control: Mutex<Control>,
}

impl Entry {
    pub fn new() -> Self {
        let (state, _) = watch::channel(Snapshot::default());
        Self {
            state,
            control: Mutex::new(Control::default()),
        }
    }

    pub fn control(&self) -> MutexGuard<'_, Control> {
        lock(&self.control)
    }
}

/// Locks `mutex`, recovering the guard if a previous holder panicked.
///
/// Critical sections in the cache only assign plain fields, so the data is
/// consistent even after a panic elsewhere.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
