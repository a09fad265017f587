//! Client-side gateway to the Tasklane backend.
//!
//! Every request goes through one [`Pipeline`]: the bearer token is attached
//! on the way out, and a 401 on the way back forces a logout before the
//! error reaches the caller. [`ApiClient`] wraps the pipeline with one typed
//! method per backend call.

pub mod auth;
pub mod client;
pub mod expiry;
pub mod pipeline;
pub mod request;
pub mod transport;

#[cfg(test)]
mod testing;

pub use auth::BearerAuth;
pub use client::ApiClient;
pub use expiry::SessionExpiry;
pub use pipeline::{Middleware, Pipeline};
pub use request::{ApiRequest, ApiResponse, FilePart, RequestBody};
pub use transport::{HttpTransport, Transport};
