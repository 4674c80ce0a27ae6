use crate::domain::{Granularity, DEFAULT_REFRESH_MS};
use crate::ticker::DEFAULT_TICK_MS;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// User settings stored in settings.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Owner every record created from this data directory belongs to
    pub owner_id: String,
    #[serde(default)]
    pub default_granularity: Granularity,
    #[serde(default = "default_refresh_rate")]
    pub default_refresh_rate: u64,
    /// Upper bound on how long the UI waits for input between redraws
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_refresh_rate() -> u64 {
    DEFAULT_REFRESH_MS
}

fn default_tick_ms() -> u64 {
    DEFAULT_TICK_MS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            owner_id: Uuid::new_v4().to_string(),
            default_granularity: Granularity::default(),
            default_refresh_rate: default_refresh_rate(),
            tick_ms: default_tick_ms(),
            log_level: default_log_level(),
        }
    }
}

/// Load settings from settings.json. `None` when the file does not exist yet.
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Option<Settings>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings: {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&content)
        .with_context(|| format!("Invalid settings file: {}", path.display()))?;
    Ok(Some(settings))
}

/// Save settings to settings.json
pub fn save_settings<P: AsRef<Path>>(path: P, settings: &Settings) -> Result<()> {
    let json = serde_json::to_string_pretty(settings)?;
    crate::persistence::atomic_write(path, &json)?;
    Ok(())
}

/// Load settings, creating the file with a fresh owner id on first run
pub fn load_or_init_settings<P: AsRef<Path>>(path: P) -> Result<Settings> {
    let path = path.as_ref();
    if let Some(settings) = load_settings(path)? {
        return Ok(settings);
    }

    let settings = Settings::default();
    save_settings(path, &settings)?;
    tracing::info!(owner = %settings.owner_id, "created settings");
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_load_nonexistent_settings() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");
        assert!(load_settings(&path).unwrap().is_none());
    }

    #[test]
    fn test_load_or_init_keeps_owner() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");

        let first = load_or_init_settings(&path).unwrap();
        assert!(path.exists());
        let second = load_or_init_settings(&path).unwrap();
        assert_eq!(first.owner_id, second.owner_id);
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");
        std::fs::write(&path, r#"{"ownerId": "me", "defaultGranularity": "hours"}"#).unwrap();

        let settings = load_settings(&path).unwrap().unwrap();
        assert_eq!(settings.owner_id, "me");
        assert_eq!(settings.default_granularity, Granularity::Hours);
        assert_eq!(settings.default_refresh_rate, 1000);
        assert_eq!(settings.tick_ms, 250);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn test_save_and_load_settings() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");

        let mut settings = Settings::default();
        settings.default_granularity = Granularity::Days;
        settings.tick_ms = 100;
        save_settings(&path, &settings).unwrap();

        assert_eq!(load_settings(&path).unwrap(), Some(settings));
    }
}
