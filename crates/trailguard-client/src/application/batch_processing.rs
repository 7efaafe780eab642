//! Batch processing hook: start a batch, then poll its status.
//!
//! # Completion side effect
//!
//! When a watched task reaches `completed` or `failed`, the project's results
//! pages are invalidated so the new detections show up.  The status query
//! keeps polling after that, and every later poll returns the same terminal
//! status, so the side effect is tied to the *transition* into a terminal
//! state: the success hook compares the status cached before the fetch with
//! the one just fetched and only reacts to the edge.
//!
//! ```text
//! poll:      pending   running   completed   completed   completed
//! edge:         ·         ·          ✓           ·           ·
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};
use trailguard_core::protocol::endpoints;
use trailguard_core::{ApiError, BatchStatus, BatchTransition, TaskDescriptor, ValidationError};

use crate::application::api::{request_fetcher, send_decoded, unavailable_fetcher, SharedTransport};
use crate::application::cache::{
    Mutation, MutationState, Query, QueryOptions, ResourceCache, SuccessHook,
};
use crate::application::keys;

/// Default status polling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// Batch operations of one project.
pub struct BatchSync {
    cache: ResourceCache,
    transport: SharedTransport,
    project_id: String,
    poll_interval: Duration,
    start: Mutation<TaskDescriptor>,
}

impl BatchSync {
    pub fn new(cache: ResourceCache, transport: SharedTransport, project_id: impl Into<String>) -> Self {
        Self {
            cache,
            transport,
            project_id: project_id.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            start: Mutation::new(),
        }
    }

    #[must_use]
    pub fn with_poll_interval(mut self, every: Duration) -> Self {
        self.poll_interval = every;
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Polls the status of `task_id` every poll interval.
    ///
    /// With no task id the query is disabled and issues no requests.
    pub fn watch_status(&self, task_id: Option<&str>) -> Query<BatchStatus> {
        let task_id = task_id.filter(|id| !id.is_empty());
        let fetcher = match task_id {
            Some(task) => request_fetcher(
                &self.transport,
                endpoints::batch_status(&self.project_id, task),
            ),
            None => unavailable_fetcher(ApiError::Decode("no task to poll".to_string())),
        };
        let options = QueryOptions::default()
            .enabled(task_id.is_some())
            .refetch_interval(self.poll_interval)
            .on_success(completion_hook(self.project_id.clone()));
        self.cache
            .subscribe(keys::batch_status(&self.project_id, task_id), fetcher, options)
    }

    /// Starts processing `image_paths` and returns the new task.
    ///
    /// # Errors
    ///
    /// [`ValidationError::MissingProjectId`] or any transport error.
    pub async fn start_batch(&self, image_paths: &[String]) -> Result<TaskDescriptor, ApiError> {
        self.start
            .run(async {
                if self.project_id.is_empty() {
                    return Err(ApiError::from(ValidationError::MissingProjectId));
                }
                let write = send_decoded(
                    self.transport.as_ref(),
                    endpoints::start_batch(&self.project_id, image_paths),
                );
                let task: TaskDescriptor = self
                    .cache
                    .mutate(write, &[keys::batch_prefix(&self.project_id)])
                    .await?;
                info!(project = %self.project_id, task = %task.task_id, paths = image_paths.len(), "batch started");
                Ok(task)
            })
            .await
    }

    pub fn is_starting(&self) -> bool {
        self.start.is_loading()
    }

    pub fn start_state(&self) -> MutationState<TaskDescriptor> {
        self.start.state()
    }
}

/// Invalidates the project's results when a task enters a terminal state.
fn completion_hook(project_id: String) -> SuccessHook {
    Arc::new(
        move |cache: &ResourceCache, previous: Option<&serde_json::Value>, next: &serde_json::Value| {
            let before = previous
                .and_then(|v| BatchStatus::deserialize(v).ok())
                .map(|s| s.status);
            let Ok(after) = BatchStatus::deserialize(next) else {
                warn!(project = %project_id, "unreadable batch status ignored");
                return;
            };
            let Some(transition) = BatchTransition::between(before, after.status) else {
                return;
            };
            if transition.leaves_terminal() {
                warn!(
                    project = %project_id,
                    from = ?transition.from,
                    to = %transition.to,
                    "task left a terminal state; ignored"
                );
            } else if transition.entered_terminal() {
                let matched = cache.invalidate(&keys::results_prefix(&project_id));
                info!(project = %project_id, status = %after.status, matched, "batch finished, results refreshed");
            }
        },
    )
}

/// `true` when `status` ends the task's lifecycle.
pub fn is_finished(status: &BatchStatus) -> bool {
    status.status.is_terminal()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use mockall::predicate::eq;
    use serde_json::{json, Value};
    use trailguard_core::{ApiRequest, BatchState, ResultsPage};

    use super::*;
    use crate::application::api::MockApiTransport;

    /// Serves scripted statuses for `t1` (repeating the last) and counts
    /// results fetches.
    fn scripted(statuses: &[&str], results_calls: &Arc<AtomicUsize>) -> MockApiTransport {
        let queue = Arc::new(Mutex::new(
            statuses.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
        ));
        let results_calls = Arc::clone(results_calls);
        let mut transport = MockApiTransport::new();
        transport.expect_send().returning(move |req: ApiRequest| {
            if req.path.ends_with("/status") {
                let mut queue = queue.lock().unwrap();
                let status = if queue.len() > 1 { queue.remove(0) } else { queue[0].clone() };
                Ok(json!({ "status": status, "task_id": "t1" }))
            } else {
                results_calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!({"images": [], "pagination": {"page": 1, "limit": 50, "total": 0}}))
            }
        });
        transport
    }

    fn results_query(cache: &ResourceCache, transport: &SharedTransport) -> Query<Value> {
        cache.subscribe(
            keys::project_results(Some("p1"), ResultsPage::default()),
            request_fetcher(transport, endpoints::project_results("p1", ResultsPage::default())),
            QueryOptions::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_task_means_no_requests() {
        // Arrange: no expectations, so any request would panic
        let batch = BatchSync::new(
            ResourceCache::default(),
            Arc::new(MockApiTransport::new()),
            "p1",
        );

        // Act
        let mut query = batch.watch_status(None);
        tokio::time::sleep(Duration::from_secs(30)).await;

        // Assert
        assert!(!query.is_enabled());
        assert!(query.poll_handle().is_none());
        assert!(query.wait_settled().await.data.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_invalidated_once_at_terminal_edge() {
        // Arrange
        let results_calls = Arc::new(AtomicUsize::new(0));
        let transport: SharedTransport = Arc::new(scripted(
            &["pending", "running", "completed"],
            &results_calls,
        ));
        let cache = ResourceCache::default();
        let mut results = results_query(&cache, &transport);
        results.wait_settled().await;
        let batch = BatchSync::new(cache.clone(), Arc::clone(&transport), "p1");

        // Act: initial fetch + 5 ticks of 2s
        let query = batch.watch_status(Some("t1"));
        tokio::time::sleep(Duration::from_millis(10_500)).await;

        // Assert: one initial results fetch plus exactly one refresh
        assert_eq!(results_calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            query.state().data.map(|s| s.status),
            Some(BatchState::Completed)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_poll_interval_fetches_once_without_polling() {
        // Arrange
        let results_calls = Arc::new(AtomicUsize::new(0));
        let transport: SharedTransport = Arc::new(scripted(&["running"], &results_calls));
        let batch = BatchSync::new(ResourceCache::default(), transport, "p1")
            .with_poll_interval(Duration::ZERO);

        // Act
        let mut query = batch.watch_status(Some("t1"));
        let first = query.wait_settled().await;
        tokio::time::sleep(Duration::from_secs(10)).await;

        // Assert
        assert!(query.poll_handle().is_none());
        assert_eq!(first.data.map(|s| s.status), Some(BatchState::Running));
        assert!(query.refetch());
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_back_to_running_is_ignored() {
        let results_calls = Arc::new(AtomicUsize::new(0));
        let transport: SharedTransport = Arc::new(scripted(
            &["completed", "running", "completed"],
            &results_calls,
        ));
        let cache = ResourceCache::default();
        let mut results = results_query(&cache, &transport);
        results.wait_settled().await;
        let batch = BatchSync::new(cache.clone(), Arc::clone(&transport), "p1");

        let _query = batch.watch_status(Some("t1"));
        tokio::time::sleep(Duration::from_millis(6_500)).await;

        // completed (edge), running (ignored), completed (edge again)
        assert_eq!(results_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_start_batch_posts_paths_and_returns_task() {
        // Arrange
        let paths = vec!["a.jpg".to_string(), "b.jpg".to_string()];
        let mut transport = MockApiTransport::new();
        transport
            .expect_send()
            .with(eq(endpoints::start_batch("p1", &paths)))
            .times(1)
            .returning(|_| Ok(json!({"task_id": "t1", "status": "pending"})));
        let batch = BatchSync::new(ResourceCache::default(), Arc::new(transport), "p1");

        // Act
        let task = batch.start_batch(&paths).await.unwrap();

        // Assert
        assert_eq!(task.task_id, "t1");
        assert!(!batch.is_starting());
        assert_eq!(batch.start_state().data, Some(task));
    }

    #[tokio::test]
    async fn test_start_batch_without_project_is_rejected() {
        let batch = BatchSync::new(
            ResourceCache::default(),
            Arc::new(MockApiTransport::new()),
            "",
        );

        let result = batch.start_batch(&["a.jpg".to_string()]).await;

        assert_eq!(
            result,
            Err(ApiError::Validation(ValidationError::MissingProjectId))
        );
    }

    #[test]
    fn test_is_finished_matches_terminal_states() {
        assert!(is_finished(&BatchStatus::new(BatchState::Failed)));
        assert!(!is_finished(&BatchStatus::new(BatchState::Running)));
    }
}
