//! Lab interface abstraction.
//!
//! This module provides a `LabInterface` trait over the upstream
//! "received orders" queue (list, fetch detail, acknowledge) and an
//! HTTP implementation using Basic Auth.

mod http;
mod types;

pub use http::HttpLabInterface;
pub use types::*;
