//! # trailguard-core
//!
//! Shared library for the TrailGuard client containing the domain entities
//! returned by the analysis service, the cache-key model used by the
//! client-side resource cache, and the REST contract expressed as plain
//! request values.
//!
//! This crate has zero dependencies on async runtimes, sockets, or HTTP
//! libraries.  Everything in it can be constructed and inspected in a plain
//! `#[test]`.
//!
//! # Architecture overview
//!
//! The TrailGuard service analyses camera-trap images for wildlife.  The
//! client keeps a local cache of server state (projects, paginated results,
//! batch status) and keeps it coherent by invalidating cache entries after
//! writes.  This crate defines the pieces of that model that carry no I/O:
//!
//! - **`domain`** – Entities (`Project`, `BatchStatus`, ...), the typed
//!   [`CacheKey`] and the [`KeyTree`] that implements prefix invalidation,
//!   image-file validation, and the batch lifecycle transition rules.
//!
//! - **`protocol`** – The back-end REST contract.  Each endpoint is a function
//!   returning an [`ApiRequest`] value; the [`ApiError`] taxonomy describes
//!   every way a request can fail.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `trailguard_core::CacheKey` instead of `trailguard_core::domain::key::CacheKey`.
pub use domain::batch::{BatchState, BatchStatus, BatchTransition, TaskDescriptor};
pub use domain::key::{CacheKey, KeySegment};
pub use domain::key_tree::KeyTree;
pub use domain::project::{NewProject, Project, ProjectResults, ResultsPage};
pub use domain::validation::ValidationError;
pub use protocol::error::ApiError;
pub use protocol::request::{ApiRequest, FilePart, Method, RequestBody};
