//! HTTP/1.1 protocol implementation.
//!
//! One request per connection, `Content-Length` framed request bodies,
//! fixed-length or chunked responses.
//!
//! # Architecture
//!
//! - **`headers`**: ordered header store and single-line header parsing
//! - **`request`**: request line and request types
//! - **`parser`**: incremental request parser driven by a read loop
//! - **`response`**: status codes, default headers, error responses
//! - **`writer`**: response writer enforcing wire order
//! - **`connection`**: per-connection request/response cycle
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Parse one request
//!        └──────┬──────┘
//!               ├─ parsed ─────────────┐
//!               │ parse error          ▼
//!               ▼               ┌──────────────┐
//!        ┌─────────────┐        │  Responding  │ ← Handler drives the writer
//!        │  Rejecting  │        └──────┬───────┘
//!        └──────┬──────┘ 400           │
//!               └──────────┬───────────┘
//!                          ▼
//!                   ┌─────────────┐
//!                   │   Closed    │
//!                   └─────────────┘
//! ```
//!
//! # Response Writer
//!
//! ```ignore
//! let mut w = ResponseWriter::new(stream);
//! w.write_status_line(StatusCode::Ok).await?;
//! let mut headers = default_headers(0);
//! headers.remove("Content-Length");
//! headers.set("Transfer-Encoding", "chunked");
//! w.write_headers(&headers).await?;
//! w.write_chunk(b"hello").await?;
//! w.write_chunked_terminator().await?;
//! ```

pub mod connection;
pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
