//! HTTP/SSE presentation boundary
//!
//! Read-only session snapshots plus the engine's command surface.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{create_router, run, AppContext};
