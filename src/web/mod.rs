//! Web interface module
//!
//! Exposes the store over HTTP for inspection and failure injection:
//! reads, writes, shard dumps, statistics, liveness and manual backups.

mod handlers;
mod server;

pub use server::{router, run_web_server};
