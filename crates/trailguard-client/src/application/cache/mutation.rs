//! Progress and outcome of a write operation.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use trailguard_core::ApiError;

/// What a consumer can see of a write.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationState<T> {
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub is_loading: bool,
}

impl<T> Default for MutationState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            is_loading: false,
        }
    }
}

/// State holder for one kind of write (create a project, analyze an image).
///
/// Each [`run`](Mutation::run) publishes `is_loading`, then the outcome.
/// [`reset`](Mutation::reset) clears the state and detaches any run still in
/// progress: its result is returned to its caller but never published.
#[derive(Debug)]
pub struct Mutation<T> {
    state: watch::Sender<MutationState<T>>,
    generation: AtomicU64,
}

impl<T> Default for Mutation<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Mutation<T> {
    pub fn new() -> Self {
        let (state, _) = watch::channel(MutationState::default());
        Self {
            state,
            generation: AtomicU64::new(0),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    /// Receiver of every state change.
    pub fn subscribe(&self) -> watch::Receiver<MutationState<T>> {
        self.state.subscribe()
    }

    /// Clears data and error and detaches in-flight runs.
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(MutationState::default());
    }
}

impl<T: Clone> Mutation<T> {
    pub fn state(&self) -> MutationState<T> {
        self.state.borrow().clone()
    }

    /// Runs `write`, publishing its progress and outcome.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `write`.
    pub async fn run<F>(&self, write: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(MutationState {
            data: None,
            error: None,
            is_loading: true,
        });

        let result = write.await;

        // Checked inside the channel lock, which `reset` also takes, so a
        // reset either precedes this (and wins) or follows it (and clears).
        self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *state = match &result {
                Ok(value) => MutationState {
                    data: Some(value.clone()),
                    error: None,
                    is_loading: false,
                },
                Err(err) => MutationState {
                    data: None,
                    error: Some(err.clone()),
                    is_loading: false,
                },
            };
            true
        });
        result
    }
}
