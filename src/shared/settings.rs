use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use crate::shared::errors::{SettingsError, SettingsResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Overrides the platform data directory when set
    pub data_dir: Option<PathBuf>,
    pub history: HistorySettings,
    pub monitor: MonitorSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Oldest unpinned items are evicted past this count; 0 disables the cap
    pub max_items: usize,
    pub slot_count: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    pub poll_interval_ms: u64,
    pub max_poll_interval_ms: u64,
    pub skip_sensitive: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            data_dir: None,
            history: HistorySettings::default(),
            monitor: MonitorSettings::default(),
        }
    }
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self {
            max_items: 1000,
            slot_count: 10,
        }
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            max_poll_interval_ms: 5000,
            skip_sensitive: true,
        }
    }
}

impl MonitorSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn max_poll_interval(&self) -> Duration {
        Duration::from_millis(self.max_poll_interval_ms.max(self.poll_interval_ms).max(1))
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "cliphist", "cliphist")
}

impl AppSettings {
    pub fn get_settings_path() -> SettingsResult<PathBuf> {
        project_dirs()
            .map(|dirs| dirs.config_dir().join("settings.json"))
            .ok_or(SettingsError::NoConfigDir)
    }

    /// Platform default for durable state, used when nothing overrides it
    pub fn default_data_dir() -> SettingsResult<PathBuf> {
        project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or(SettingsError::NoConfigDir)
    }

    /// Resolve the data directory: explicit override, then settings, then platform default
    pub fn resolve_data_dir(&self, override_dir: Option<&Path>) -> SettingsResult<PathBuf> {
        if let Some(dir) = override_dir {
            return Ok(dir.to_path_buf());
        }
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Self::default_data_dir(),
        }
    }

    /// Load settings from the platform config location
    pub async fn load() -> SettingsResult<Self> {
        let path = Self::get_settings_path()?;
        Self::load_from(&path).await
    }

    /// Load settings from `path`, writing defaults there on first use
    pub async fn load_from(path: &Path) -> SettingsResult<Self> {
        if !fs::try_exists(path).await? {
            debug!(path = %path.display(), "settings file missing, writing defaults");
            let settings = Self::default();
            settings.save_to(path).await?;
            return Ok(settings);
        }

        let content = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    pub async fn save_to(&self, path: &Path) -> SettingsResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }
}
