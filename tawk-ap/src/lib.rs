//! # Tawk Audio Player Library (tawk-ap)
//!
//! Global playback orchestrator for short social audio posts.
//!
//! **Purpose:** Own "what is playing right now" for the whole process: play an
//! optional intro jingle before each parent, advance through the explicit
//! queue, then autoplay through the feed while skipping parents already heard
//! this session. Stays correct under rapid overlapping commands by ordering
//! every intent with a race token.
//!
//! **Architecture:** two-channel transport over a pluggable `AudioBackend`,
//! single-writer session state, a polling finish watcher, and an axum
//! HTTP/SSE boundary.

pub mod api;
pub mod config;
pub mod error;
pub mod playback;
pub mod state;

pub use error::{Error, Result};
pub use state::SharedState;
