//! Configuration for the Contour core
//!
//! Covers the remote DSP engine endpoint, default transform options and
//! playback transport tuning. Configs are plain YAML files; a missing or
//! unparseable file falls back to defaults with a warning so a bad edit
//! never prevents startup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::eq::TransformOptions;

/// Remote DSP engine connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Base URL of the DSP service (no trailing slash)
    pub base_url: String,
    /// Per-request timeout in seconds
    ///
    /// Transforms over long files are minutes-scale; a timeout is surfaced
    /// as a regular engine failure.
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 120,
        }
    }
}

impl EngineConfig {
    /// Request timeout as a `Duration`
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Playback transport tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Position broadcast rate in Hz while playing
    pub tick_hz: u32,
    /// Lower bound for the playback rate control
    pub min_rate: f64,
    /// Upper bound for the playback rate control
    pub max_rate: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_hz: 60,
            min_rate: 0.25,
            max_rate: 4.0,
        }
    }
}

impl PlaybackConfig {
    /// Broadcast interval between position ticks
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_hz.max(1) as f64)
    }
}

/// Top-level Contour core configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub transform: TransformOptions,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

/// Default config file location (`~/.config/contour/core.yaml` on Linux)
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("contour")
        .join("core.yaml")
}

/// Load a YAML configuration file
///
/// Returns the default config if the file doesn't exist or fails to parse;
/// parse failures are logged as warnings rather than propagated.
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        log::info!("config: {:?} not found, using defaults", path);
        return T::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match serde_yaml::from_str::<T>(&contents) {
            Ok(config) => {
                log::info!("config: loaded {:?}", path);
                config
            }
            Err(e) => {
                log::warn!("config: failed to parse {:?}: {}, using defaults", path, e);
                T::default()
            }
        },
        Err(e) => {
            log::warn!("config: failed to read {:?}: {}, using defaults", path, e);
            T::default()
        }
    }
}

/// Save a configuration as YAML, creating parent directories as needed
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory {:?}", parent))?;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;
    std::fs::write(path, yaml).with_context(|| format!("Failed to write config file {:?}", path))?;

    log::info!("config: saved {:?}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_returns_default() {
        let config: CoreConfig = load_config(Path::new("/nonexistent/contour/core.yaml"));
        assert_eq!(config, CoreConfig::default());
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("core.yaml");

        let mut config = CoreConfig::default();
        config.engine.base_url = "http://dsp.internal:9000".to_string();
        config.playback.tick_hz = 30;

        save_config(&config, &path).unwrap();
        let loaded: CoreConfig = load_config(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_yaml_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("core.yaml");
        std::fs::write(&path, ": not yaml [").unwrap();

        let config: CoreConfig = load_config(&path);
        assert_eq!(config, CoreConfig::default());
    }

    #[test]
    fn test_tick_interval() {
        let playback = PlaybackConfig {
            tick_hz: 50,
            ..Default::default()
        };
        assert_eq!(playback.tick_interval(), Duration::from_millis(20));
    }
}
