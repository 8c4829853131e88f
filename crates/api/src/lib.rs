//! HTTP API: turns trusted proxy headers into bridge calls and redirects.

pub mod app;
pub mod context;
pub mod middleware;
