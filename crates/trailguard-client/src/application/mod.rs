//! Application layer of the client.
//!
//! # What lives here?
//!
//! - **`api`** – The [`api::ApiTransport`] trait through which every request
//!   leaves the process.  The reqwest implementation lives in the
//!   infrastructure layer and is injected at construction time, so the whole
//!   layer can be exercised against an in-memory back end.
//!
//! - **`cache`** – The resource cache: keyed storage of server state,
//!   request coalescing, prefix invalidation, interval polling, and the
//!   mutation state holder.
//!
//! - **`keys`** – The cache keys each resource lives under.  Keeping them in
//!   one place makes the invalidation relationships easy to audit.
//!
//! - **`projects`**, **`image_analysis`**, **`batch_processing`**,
//!   **`species`**, **`live_updates`** – The data-sync hooks, one per API
//!   resource.

pub mod api;
pub mod batch_processing;
pub mod cache;
pub mod image_analysis;
pub mod keys;
pub mod live_updates;
pub mod projects;
pub mod species;
