//! Configuration for tawk-ap
//!
//! TOML bootstrap file with every field defaulted. Sources in priority order:
//!
//! 1. Command-line arguments (`--port`, `--feed`, `--autoplay`, `--no-replies`)
//! 2. Environment variables (`TAWK_AP_CONFIG`, `TAWK_AP_PORT`, `TAWK_AP_FEED`)
//! 3. TOML configuration file (`tawk-ap.toml`)
//! 4. Built-in defaults
//!
//! Settings are read once at startup; restart to pick up changes.

use crate::error::{Error, Result};
use crate::playback::engine::EngineSettings;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tawk_common::PlayableSource;
use tracing::info;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "TAWK_AP_CONFIG";

/// File name looked up in the platform config directory
pub const CONFIG_FILE_NAME: &str = "tawk-ap.toml";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// HTTP server port
    pub port: u16,

    pub bind_address: String,

    /// JSON array of sources handed to `set_feed` at startup
    pub feed_path: Option<PathBuf>,

    pub playback: PlaybackConfig,

    pub simulation: SimulationConfig,

    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: 5741,
            bind_address: "127.0.0.1".to_string(),
            feed_path: None,
            playback: PlaybackConfig::default(),
            simulation: SimulationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Orchestrator timing and default toggles
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Longest wait for an intro jingle before main playback proceeds
    pub jingle_timeout_ms: u64,
    pub finish_poll_interval_ms: u64,
    pub include_replies: bool,
    pub include_autoplay: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            jingle_timeout_ms: 10_000,
            finish_poll_interval_ms: 200,
            include_replies: true,
            include_autoplay: false,
        }
    }
}

/// Clock-driven backend parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub status_interval_ms: u64,
    /// Length of clips whose source carries no duration
    pub default_duration_secs: f64,
    /// Length of every intro clip
    pub jingle_duration_secs: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            status_interval_ms: 250,
            default_duration_secs: 30.0,
            jingle_duration_secs: 3.0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Load from the resolved config file, or defaults when none exists
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let resolved =
            tawk_common::config::resolve_config_file(cli_path, CONFIG_ENV_VAR, CONFIG_FILE_NAME)?;

        let config = match resolved {
            Some(path) => {
                info!("Loading config from {}", path.display());
                tawk_common::config::load_toml(&path)?
            }
            None => {
                info!("No config file found, using built-in defaults");
                Self::default()
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("playback.jingle_timeout_ms", self.playback.jingle_timeout_ms),
            (
                "playback.finish_poll_interval_ms",
                self.playback.finish_poll_interval_ms,
            ),
            (
                "simulation.status_interval_ms",
                self.simulation.status_interval_ms,
            ),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(Error::Config(format!("{} must be greater than zero", name)));
            }
        }

        if !(self.simulation.default_duration_secs > 0.0) {
            return Err(Error::Config(
                "simulation.default_duration_secs must be positive".to_string(),
            ));
        }
        if !(self.simulation.jingle_duration_secs > 0.0) {
            return Err(Error::Config(
                "simulation.jingle_duration_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Layer command-line values on top of the file
    pub fn apply_overrides(
        &mut self,
        port: Option<u16>,
        feed_path: Option<PathBuf>,
        autoplay: bool,
        no_replies: bool,
    ) {
        if let Some(port) = port {
            self.port = port;
        }
        if let Some(path) = feed_path {
            self.feed_path = Some(path);
        }
        if autoplay {
            self.playback.include_autoplay = true;
        }
        if no_replies {
            self.playback.include_replies = false;
        }
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            jingle_timeout: Duration::from_millis(self.playback.jingle_timeout_ms),
            finish_poll_interval: Duration::from_millis(self.playback.finish_poll_interval_ms),
            include_replies: self.playback.include_replies,
            include_autoplay: self.playback.include_autoplay,
        }
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.simulation.status_interval_ms)
    }
}

/// Read a JSON array of sources
pub fn load_feed(path: &Path) -> Result<Vec<PlayableSource>> {
    let content = std::fs::read_to_string(path)?;
    let sources: Vec<PlayableSource> =
        serde_json::from_str(&content).map_err(tawk_common::Error::from)?;
    if let Some(position) = sources.iter().position(|s| s.id.is_empty()) {
        return Err(tawk_common::Error::InvalidInput(format!(
            "feed entry {} in {} has an empty id",
            position,
            path.display()
        ))
        .into());
    }
    info!("Loaded {} feed sources from {}", sources.len(), path.display());
    Ok(sources)
}
