//! Interval refetching.

use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;
use trailguard_core::CacheKey;

use super::entry::lock;
use super::store::ResourceCache;

/// A running poller that refetches one key on a fixed interval.
///
/// The first refetch happens one interval after creation.  A tick that finds
/// a fetch still running is skipped.  The poller stops on [`cancel`] or when
/// the handle is dropped.
///
/// [`cancel`]: PollHandle::cancel
#[derive(Debug)]
pub struct PollHandle {
    task: Mutex<Option<JoinHandle<()>>>,
    every: Duration,
}

impl PollHandle {
    pub(crate) fn spawn(cache: ResourceCache, key: CacheKey, every: Duration) -> Self {
        debug!(%key, ?every, "polling started");
        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !cache.refetch(&key) {
                    debug!(%key, "poll tick skipped, fetch still running");
                }
            }
        });
        Self {
            task: Mutex::new(Some(task)),
            every,
        }
    }

    pub fn interval(&self) -> Duration {
        self.every
    }

    /// Stops polling.  Returns `true` for the call that actually stopped it;
    /// later calls do nothing.
    pub fn cancel(&self) -> bool {
        match lock(&self.task).take() {
            Some(task) => {
                task.abort();
                debug!("polling cancelled");
                true
            }
            None => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        lock(&self.task).is_none()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
