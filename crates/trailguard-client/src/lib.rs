//! trailguard-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does trailguard-client do? (for beginners)
//!
//! The TrailGuard back end analyses camera-trap photos and groups them into
//! projects.  A dashboard talking to it has to answer the same questions over
//! and over: *which projects exist, what did the last batch find, is the
//! running batch finished yet?*  Asking the server every time is wasteful,
//! and caching answers blindly shows stale data after a write.
//!
//! This crate sits between a front end and the REST API and keeps a local
//! copy of server state coherent:
//!
//! 1. A **resource cache** stores each fetched document under a typed key
//!    such as `["projects", "p1", "results", 1, 50]`.  Concurrent readers of
//!    one key share a single request.
//! 2. **Data-sync hooks** (`ProjectSync`, `ImageAnalysis`, `BatchSync`, ...)
//!    bind each API resource to a key and expose loading/error state.
//! 3. Every successful **write** invalidates the keys it affects (creating a
//!    project refreshes the project list), and observed entries refetch.
//! 4. A running batch is **polled** on an interval; the moment it finishes,
//!    the project's results are refreshed exactly once.

/// Application layer: the resource cache and the data-sync hooks.
pub mod application;

/// Infrastructure layer: HTTP and WebSocket adapters, configuration files.
pub mod infrastructure;
