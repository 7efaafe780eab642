//! HTTP adapters implementing [`ApiTransport`](crate::application::api::ApiTransport).
//!
//! - **`reqwest_transport`** – Talks to a real back end.
//! - **`mock`** – An in-memory back end with the same contract, for tests
//!   and offline demos.

pub mod mock;
pub mod reqwest_transport;

pub use mock::MockBackend;
pub use reqwest_transport::HttpTransport;
