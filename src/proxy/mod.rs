//! Forwarding requests to a plain-HTTP upstream.
//!
//! The upstream client speaks just enough HTTP/1.1 to fetch one resource
//! and hand its body back piece by piece, whatever framing the upstream
//! chose for it.

pub mod upstream;

pub use upstream::{Upstream, UpstreamResponse};
