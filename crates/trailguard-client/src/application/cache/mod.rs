//! The resource cache.
//!
//! # How it works (for beginners)
//!
//! Every piece of server state the client shows (the project list, page 2 of
//! a project's results, the status of a running batch) is stored under a
//! [`CacheKey`](trailguard_core::CacheKey).  A consumer asks for a key by
//! *subscribing* with a fetcher, a closure that knows how to load that
//! resource.  The cache then:
//!
//! - **loads** the resource if nothing fresh is stored, sharing one request
//!   between every subscriber that asks at the same time;
//! - **publishes** every state change (`is_loading`, `data`, `error`, ...)
//!   through a `tokio::sync::watch` channel the [`Query`] reads from;
//! - **invalidates** by prefix: after a write, the affected keys are marked
//!   stale and the ones somebody is still looking at are loaded again;
//! - **polls** keys that asked for a refetch interval until the query is
//!   dropped.
//!
//! ```text
//!  Query ──subscribe──► ResourceCache ──fetcher()──► ApiTransport
//!    ▲                      │
//!    └──── watch<Snapshot> ─┘  (one Entry per key, held in a KeyTree)
//! ```
//!
//! Values are stored as JSON and decoded on read, so one entry can serve
//! subscribers regardless of the Rust type they decode into.

mod entry;
pub mod mutation;
pub mod poll;
pub mod query;
pub mod store;

use std::sync::Arc;

use futures_util::future::BoxFuture;
use trailguard_core::ApiError;

pub use mutation::{Mutation, MutationState};
pub use poll::PollHandle;
pub use query::{Query, QueryOptions, QueryState};
pub use store::{CacheConfig, ResourceCache};

/// Loads one resource.  Called again for every refetch.
pub type Fetcher =
    Arc<dyn Fn() -> BoxFuture<'static, Result<serde_json::Value, ApiError>> + Send + Sync>;

/// Runs after a fetched value has been stored, with the value it replaced.
///
/// Receives the cache so the hook can invalidate other keys without holding
/// a handle of its own.
pub type SuccessHook =
    Arc<dyn Fn(&ResourceCache, Option<&serde_json::Value>, &serde_json::Value) + Send + Sync>;
