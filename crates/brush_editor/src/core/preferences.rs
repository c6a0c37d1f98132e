//! Editor preferences and settings.
//!
//! Persistent settings that survive editor restarts, stored as TOML.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading or writing preferences.
#[derive(Debug, Error)]
pub enum PreferencesError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Autosave policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveSettings {
    pub enabled: bool,
    /// Minutes between autosaves; values below 1 count as 1.
    pub interval_minutes: u32,
    /// Autosave files kept per map (0 = keep all).
    pub limit: usize,
    /// Skip the autosave when nothing changed since the last save.
    pub only_on_changed: bool,
    /// Write autosaves here instead of next to the map, if it exists.
    pub custom_directory: Option<PathBuf>,
}

impl Default for AutosaveSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_minutes: 5,
            limit: 5,
            only_on_changed: true,
            custom_directory: None,
        }
    }
}

impl AutosaveSettings {
    pub fn interval(&self) -> Duration {
        Duration::minutes(i64::from(self.interval_minutes.max(1)))
    }
}

/// Editor preferences and settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorPreferences {
    /// Maximum undo entries per document (0 = unlimited)
    pub history_limit: usize,

    // Viewport settings
    pub grid_spacing: f32,
    pub snap_to_grid: bool,

    // Auto-save settings
    pub autosave: AutosaveSettings,

    // Game configuration
    pub game_data_files: Vec<PathBuf>,

    // Recent files
    pub max_recent_files: usize,

    // Last used directories
    pub last_map_directory: Option<PathBuf>,
}

impl Default for EditorPreferences {
    fn default() -> Self {
        Self {
            history_limit: 100,
            grid_spacing: 16.0,
            snap_to_grid: true,
            autosave: AutosaveSettings::default(),
            game_data_files: Vec::new(),
            max_recent_files: 10,
            last_map_directory: None,
        }
    }
}

impl EditorPreferences {
    /// Load preferences from a file.
    pub fn load(path: &Path) -> Result<Self, PreferencesError> {
        let content = fs::read_to_string(path)?;
        let prefs = toml::from_str(&content)?;
        log::info!("Loaded preferences from {:?}", path);
        Ok(prefs)
    }

    /// Load preferences, falling back to defaults if the file is missing or
    /// unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(prefs) => prefs,
            Err(PreferencesError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                log::warn!("Using default preferences, {:?} could not be loaded: {}", path, e);
                Self::default()
            }
        }
    }

    /// Save preferences to a file.
    pub fn save(&self, path: &Path) -> Result<(), PreferencesError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        log::info!("Saved preferences to {:?}", path);
        Ok(())
    }

    /// Get the default preferences path.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("brushwork");
            p.push("preferences.toml");
            p
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("preferences.toml");
        let mut prefs = EditorPreferences::default();
        prefs.autosave.limit = 2;
        prefs.game_data_files.push(PathBuf::from("halflife.toml"));

        prefs.save(&path).unwrap();
        assert_eq!(EditorPreferences::load(&path).unwrap(), prefs);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.toml");
        fs::write(&path, "grid_spacing = 8.0\n[autosave]\nenabled = false\n").unwrap();

        let prefs = EditorPreferences::load(&path).unwrap();
        assert_eq!(prefs.grid_spacing, 8.0);
        assert!(!prefs.autosave.enabled);
        assert_eq!(prefs.autosave.limit, AutosaveSettings::default().limit);
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.toml");
        fs::write(&path, "grid_spacing = \"wide\"").unwrap();

        assert!(EditorPreferences::load(&path).is_err());
        assert_eq!(EditorPreferences::load_or_default(&path), EditorPreferences::default());
        assert_eq!(
            EditorPreferences::load_or_default(&dir.path().join("missing.toml")),
            EditorPreferences::default()
        );
    }

    #[test]
    fn test_interval_has_a_floor() {
        let settings = AutosaveSettings {
            interval_minutes: 0,
            ..Default::default()
        };
        assert_eq!(settings.interval(), Duration::minutes(1));
    }
}
