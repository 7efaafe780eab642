//! Realtime project feed.
//!
//! The back end pushes a message over a WebSocket whenever something changes
//! for a project.  [`LiveUpdates`] forwards each message to the consumer and
//! invalidates the project's results so watched pages refresh.  The socket
//! itself is opened by the infrastructure layer; this module only needs a
//! stream of parsed events, which keeps it testable without a server.

use std::fmt::Display;

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use trailguard_core::domain::realtime::ProjectEvent;

use crate::application::cache::ResourceCache;
use crate::application::keys;

/// Events buffered between the feed task and a slow consumer.
const EVENT_BUFFER: usize = 64;

/// A running realtime feed for one project.
///
/// Dropping it stops the feed.
#[derive(Debug)]
pub struct LiveUpdates {
    events: mpsc::Receiver<ProjectEvent>,
    task: JoinHandle<()>,
}

impl LiveUpdates {
    /// Starts consuming `feed`.
    ///
    /// Every event except the `connected` handshake invalidates
    /// `["projects", project_id, "results"]`.  A feed error is logged and
    /// ends the feed.
    pub fn start<S, E>(cache: ResourceCache, project_id: impl Into<String>, feed: S) -> Self
    where
        S: Stream<Item = Result<ProjectEvent, E>> + Send + Unpin + 'static,
        E: Display + Send + 'static,
    {
        let project_id = project_id.into();
        let (tx, events) = mpsc::channel(EVENT_BUFFER);
        let task = tokio::spawn(pump(cache, project_id, feed, tx));
        Self { events, task }
    }

    /// Next event, or `None` once the feed has ended.
    pub async fn next(&mut self) -> Option<ProjectEvent> {
        self.events.recv().await
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for LiveUpdates {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn pump<S, E>(cache: ResourceCache, project_id: String, mut feed: S, tx: mpsc::Sender<ProjectEvent>)
where
    S: Stream<Item = Result<ProjectEvent, E>> + Unpin,
    E: Display,
{
    while let Some(item) = feed.next().await {
        let event = match item {
            Ok(event) => event,
            Err(e) => {
                warn!(project = %project_id, "live feed error: {e}");
                break;
            }
        };
        if event.is_handshake() {
            info!(project = %project_id, "live feed connected");
        } else {
            debug!(project = %project_id, kind = %event.kind, "live event");
            cache.invalidate(&keys::results_prefix(&project_id));
        }
        if tx.send(event).await.is_err() {
            // Consumer went away.
            break;
        }
    }
    debug!(project = %project_id, "live feed ended");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
