use std::{env, path::PathBuf};

use super::schema::Settings;

/// Configuration loading helpers.
///
/// `Settings::load` reads an optional config file, then layers environment
/// variables (prefix `METERPLAY__`) over it and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("METERPLAY")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        let engine = &self.engine;
        if engine.meter_interval_ms == 0 {
            return Err("engine.meter_interval_ms must be >= 1".to_string());
        }
        if engine.progress_interval_ms == 0 {
            return Err("engine.progress_interval_ms must be >= 1".to_string());
        }
        if !engine.meter_floor_db.is_finite() || engine.meter_floor_db >= 0.0 {
            return Err("engine.meter_floor_db must be a finite level below 0 dB".to_string());
        }
        if !(0.0..=1.0).contains(&engine.idle_amplitude) {
            return Err("engine.idle_amplitude must be within [0, 1]".to_string());
        }
        if !(engine.end_of_track_threshold > 0.0 && engine.end_of_track_threshold <= 1.0) {
            return Err("engine.end_of_track_threshold must be within (0, 1]".to_string());
        }
        if self.library.extensions.iter().all(|e| e.trim().is_empty()) {
            return Err("library.extensions must name at least one extension".to_string());
        }
        Ok(())
    }
}

/// Resolve the config path from `METERPLAY_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("METERPLAY_CONFIG_PATH") {
        return Some(PathBuf::from(p));
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/meterplay/config.toml`
/// or `~/.config/meterplay/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    };

    config_home.map(|d| d.join("meterplay").join("config.toml"))
}
