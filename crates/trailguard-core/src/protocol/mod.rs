//! The back-end REST contract.
//!
//! Requests are plain values ([`request::ApiRequest`]) built by the functions
//! in [`endpoints`]; sending them is the job of a transport in the client
//! crate.  Keeping the contract here means the exact paths, query
//! parameters, and body encodings are unit-testable without a network.

pub mod endpoints;
pub mod error;
pub mod request;

pub use error::ApiError;
pub use request::{ApiRequest, FilePart, Method, RequestBody};
