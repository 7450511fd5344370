//! Compute service client
//!
//! The partition/path computation lives in an external service; the engine
//! only ever talks to it through the `ComputeService` trait.

mod http;
mod traits;

pub use http::HttpComputeService;
pub use traits::{ComputeService, Polygon};
