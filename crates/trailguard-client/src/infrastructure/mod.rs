//! Infrastructure layer for the client.
//!
//! Contains the adapters that touch the outside world: the HTTP transport,
//! the realtime WebSocket, and the configuration file.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `trailguard_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`http`** – [`ApiTransport`](crate::application::api::ApiTransport)
//!   implementations: `HttpTransport` (reqwest) for the real back end and
//!   `MockBackend`, an in-memory back end used by tests and demos.
//!
//! - **`realtime`** – Opens the per-project WebSocket and turns its frames
//!   into a stream of `ProjectEvent`s.
//!
//! - **`storage`** – TOML configuration persistence.

pub mod http;
pub mod realtime;
pub mod storage;
