//! Connection server: accept loop, per-connection tasks, shutdown.

pub mod handler;
pub mod listener;

pub use handler::Handler;
pub use listener::Server;
