//! httpfromtcp - an HTTP/1.1 server written directly against TCP.
//!
//! Request parsing, response writing and the connection server are all
//! implemented here on top of tokio's byte streams, without an HTTP library.

pub mod config;
pub mod http;
pub mod proxy;
pub mod routes;
pub mod server;
