//! Playback orchestration: transport, session state and the engine

pub mod engine;
pub mod finish_watcher;
pub mod race;
pub mod session;
pub mod simulated;
pub mod transport;

pub use engine::{EngineSettings, PlaybackEngine};
pub use finish_watcher::FinishWatcher;
pub use race::RaceToken;
pub use session::{SessionSnapshot, SessionState};
pub use simulated::SimulatedBackend;
pub use transport::{AudioBackend, Channel, ChannelStatus, HandleId, StatusSubscription, Transport};
