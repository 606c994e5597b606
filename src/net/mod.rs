//! Newline-delimited JSON transport for the command surface.
//!
//! One request object per line, one response object per line, any number of
//! requests per connection.

pub mod client;
pub mod server;

pub use client::send_request;
pub use server::CommandServer;

/// Longest request line accepted by the server.
pub const MAX_LINE_BYTES: usize = 64 * 1024;
