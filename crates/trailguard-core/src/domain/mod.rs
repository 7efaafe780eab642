//! Domain layer: pure types describing server state and cache identity.
//!
//! Nothing in this module performs I/O.  The entities mirror the JSON
//! documents returned by the analysis service; the key types describe how
//! those documents are addressed inside the client cache.
//!
//! # Sub-modules
//!
//! - **`key`** / **`key_tree`** – Cache identity and prefix invalidation.
//! - **`project`**, **`batch`**, **`analysis`**, **`catalog`**,
//!   **`realtime`** – Entities returned by the REST and WebSocket endpoints.
//! - **`validation`** – Client-side checks performed before a request is
//!   issued (image selection, project names, pagination bounds).

pub mod analysis;
pub mod batch;
pub mod catalog;
pub mod key;
pub mod key_tree;
pub mod project;
pub mod realtime;
pub mod validation;
