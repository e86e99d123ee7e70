//! # Tawk Common Library
//!
//! Shared code for the tawk playback stack including:
//! - Playable source model (`PlayableSource`, authors, rooms)
//! - Event types (`PlayerEvent` enum) broadcast to observers
//! - Configuration file discovery
//! - Human-readable time formatting

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;
pub mod source;

pub use error::{Error, Result};
pub use source::{Author, PlayableSource, Room};
