use std::path::PathBuf;

use serde::Deserialize;

/// Top-level settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/meterplay/config.toml` or `~/.config/meterplay/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `METERPLAY__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineSettings,
    pub library: LibrarySettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Period of the metering tick (milliseconds).
    pub meter_interval_ms: u64,
    /// Period of the progress tick (milliseconds).
    pub progress_interval_ms: u64,
    /// Channel power at or below this level maps to amplitude 0.0 (dB, negative).
    pub meter_floor_db: f32,
    /// Channel sampled by the metering tick.
    pub meter_channel: usize,
    /// Amplitude published whenever nothing is playing.
    pub idle_amplitude: f32,
    /// Fraction of the duration past which a silent session counts as finished.
    pub end_of_track_threshold: f64,
    /// How long the completion notification gets before position-based
    /// end-of-track inference takes over (milliseconds).
    pub completion_grace_ms: u64,
    /// Repeat mode at startup.
    pub repeat: RepeatSetting,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            meter_interval_ms: 50,
            progress_interval_ms: 100,
            meter_floor_db: -80.0,
            meter_channel: 0,
            idle_amplitude: 0.1,
            end_of_track_threshold: 0.99,
            completion_grace_ms: 300,
            repeat: RepeatSetting::Off,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepeatSetting {
    #[serde(alias = "none", alias = "no-repeat", alias = "no_repeat")]
    Off,
    #[serde(
        alias = "one",
        alias = "repeat-one",
        alias = "repeat_one",
        alias = "loop-one"
    )]
    Track,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
    /// Base directory for relative media locators.
    pub media_root: Option<PathBuf>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            extensions: vec!["mp3".into(), "flac".into(), "wav".into(), "ogg".into()],
            follow_links: true,
            include_hidden: false,
            recursive: true,
            max_depth: None,
            media_root: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing` filter directive, used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}
