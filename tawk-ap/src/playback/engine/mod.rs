//! Playback engine (the orchestrator)
//!
//! **Module Structure:**
//! - `core.rs`: struct, lifecycle, shared helpers (main playback start, stop)
//! - `playback.rs`: user commands (play, reply, toggle, skip, seek, close, settings)
//! - `queue.rs`: explicit queue manipulation (jump, remove, enqueue)
//! - `intro.rs`: intro jingle policy and the suspended jingle wait
//! - `advance.rs`: what happens when the main channel finishes
//!
//! Every operation that will asynchronously start playback captures a race
//! token and re-checks it before touching session state or the transport.
//! Lock order is transport before session; the session lock is never held
//! across an await.

mod advance;
mod core;
mod intro;
mod playback;
mod queue;

pub use core::{EngineSettings, PlaybackEngine};
