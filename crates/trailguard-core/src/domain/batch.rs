//! Batch-processing status and the client-observed lifecycle.
//!
//! A batch is started by posting a list of image paths; the server answers
//! with a [`TaskDescriptor`] whose `task_id` is then polled for a
//! [`BatchStatus`].  From the client's point of view a task moves through:
//!
//! ```text
//! idle ──start_batch──► pending ──► running ──► completed
//!                                          └──► failed
//! ```
//!
//! `completed` and `failed` are terminal.  Leaving a terminal state requires
//! a new `start_batch` call, which yields a new `task_id` and therefore a
//! fresh lifecycle.
//!
//! # Edge detection
//!
//! Side effects tied to completion (refreshing the project's results) must
//! fire once per transition, not once per poll.  [`BatchTransition`] models
//! the change between two consecutive observations so callers can react to
//! the `running → completed` edge rather than to the `completed` level.

use serde::{Deserialize, Serialize};

/// Server-side state of a batch task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    Pending,
    Running,
    Completed,
    Failed,
    /// Any status string this client does not know about.
    #[serde(other)]
    Unknown,
}

impl BatchState {
    /// `true` for `completed` and `failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, BatchState::Completed | BatchState::Failed)
    }
}

impl std::fmt::Display for BatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BatchState::Pending => "pending",
            BatchState::Running => "running",
            BatchState::Completed => "completed",
            BatchState::Failed => "failed",
            BatchState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Document returned by `GET /api/projects/{id}/status?task_id=`.
///
/// Only `status` is interpreted; every other field is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStatus {
    pub status: BatchState,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

impl BatchStatus {
    /// A status document with no extra fields.
    pub fn new(status: BatchState) -> Self {
        Self {
            status,
            details: serde_json::Map::new(),
        }
    }
}

/// Document returned by `POST /api/projects/{id}/batch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub task_id: String,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

/// A change between two consecutive status observations of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchTransition {
    /// `None` when nothing had been observed yet for the task.
    pub from: Option<BatchState>,
    pub to: BatchState,
}

impl BatchTransition {
    /// Returns the transition from `previous` to `next`, or `None` when the
    /// state did not change.
    pub fn between(previous: Option<BatchState>, next: BatchState) -> Option<Self> {
        if previous == Some(next) {
            return None;
        }
        Some(Self {
            from: previous,
            to: next,
        })
    }

    /// `true` exactly when a non-terminal (or unobserved) task becomes
    /// terminal.
    pub fn entered_terminal(&self) -> bool {
        self.to.is_terminal() && !self.from.is_some_and(BatchState::is_terminal)
    }

    /// `true` when a task leaves a terminal state, which the lifecycle does
    /// not allow for a single task id.
    pub fn leaves_terminal(&self) -> bool {
        self.from.is_some_and(BatchState::is_terminal)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_decodes_lowercase_and_keeps_details() {
        // Arrange
        let raw = json!({"status": "running", "processed": 12, "total": 40});

        // Act
        let status: BatchStatus = serde_json::from_value(raw).unwrap();

        // Assert
        assert_eq!(status.status, BatchState::Running);
        assert_eq!(status.details["processed"], 12);
        assert_eq!(status.details.len(), 2);
    }

    #[test]
    fn test_unrecognised_status_decodes_as_unknown() {
        let status: BatchStatus = serde_json::from_value(json!({"status": "queued"})).unwrap();
        assert_eq!(status.status, BatchState::Unknown);
        assert!(!status.status.is_terminal());
    }

    #[test]
    fn test_task_descriptor_decodes() {
        let task: TaskDescriptor =
            serde_json::from_value(json!({"task_id": "t1", "queued": 2})).unwrap();
        assert_eq!(task.task_id, "t1");
        assert_eq!(task.details["queued"], 2);
    }

    #[test]
    fn test_only_completed_and_failed_are_terminal() {
        assert!(BatchState::Completed.is_terminal());
        assert!(BatchState::Failed.is_terminal());
        assert!(!BatchState::Pending.is_terminal());
        assert!(!BatchState::Running.is_terminal());
    }

    #[test]
    fn test_same_state_is_not_a_transition() {
        assert_eq!(
            BatchTransition::between(Some(BatchState::Completed), BatchState::Completed),
            None
        );
    }

    #[test]
    fn test_pending_running_completed_enters_terminal_once() {
        // Arrange: a typical poll sequence, including a repeated terminal tick
        let observed = [
            BatchState::Pending,
            BatchState::Running,
            BatchState::Running,
            BatchState::Completed,
            BatchState::Completed,
        ];

        // Act: count terminal edges across consecutive observations
        let mut previous = None;
        let mut edges = Vec::new();
        for state in observed {
            if let Some(t) = BatchTransition::between(previous, state) {
                if t.entered_terminal() {
                    edges.push(t);
                }
            }
            previous = Some(state);
        }

        // Assert: exactly one edge, at running → completed
        assert_eq!(
            edges,
            vec![BatchTransition {
                from: Some(BatchState::Running),
                to: BatchState::Completed
            }]
        );
    }

    #[test]
    fn test_first_observation_already_terminal_counts_as_edge() {
        let t = BatchTransition::between(None, BatchState::Failed).unwrap();
        assert!(t.entered_terminal());
    }

    #[test]
    fn test_terminal_to_terminal_is_not_an_edge() {
        let t = BatchTransition::between(Some(BatchState::Completed), BatchState::Failed).unwrap();
        assert!(!t.entered_terminal());
        assert!(t.leaves_terminal());
    }

    #[test]
    fn test_terminal_to_running_is_flagged() {
        let t = BatchTransition::between(Some(BatchState::Completed), BatchState::Running).unwrap();
        assert!(t.leaves_terminal());
        assert!(!t.entered_terminal());
    }
}
