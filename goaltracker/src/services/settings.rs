//! Settings service
//!
//! Manages application settings persistence using JSON file storage.

use crate::config::{DEFAULT_API_BASE, DEFAULT_REMOTE_SCHEMA};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

/// Remote backend configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_schema")]
    pub schema: String,
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_schema() -> String {
    DEFAULT_REMOTE_SCHEMA.to_string()
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_base_url(),
            schema: default_schema(),
        }
    }
}

/// Which backend a session may use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistencePreference {
    /// Remote when it initializes, local otherwise
    #[default]
    Auto,
    Remote,
    /// Never contact the remote backend
    Local,
}

/// How fallback-mode login treats credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OfflineAuthPolicy {
    /// Passwords are hashed locally and checked on login
    #[default]
    Verified,
    /// Any login succeeds with a synthesized local user
    Demo,
}

/// Remote prompt usage for suggestions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestionSettings {
    #[serde(default)]
    pub use_remote: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    System,
}

impl Theme {
    /// Light and dark swap; System becomes Light
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark | Theme::System => Theme::Light,
        }
    }
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AppSettings {
    #[serde(default)]
    pub remote: RemoteSettings,
    #[serde(default)]
    pub persistence: PersistencePreference,
    #[serde(default)]
    pub offline_auth: OfflineAuthPolicy,
    #[serde(default)]
    pub suggestions: SuggestionSettings,
    #[serde(default)]
    pub theme: Theme,
}

/// Service for managing application settings
#[derive(Clone)]
pub struct SettingsService {
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new(app_data_dir: PathBuf) -> Self {
        Self {
            settings_path: app_data_dir.join("settings.json"),
        }
    }

    /// Load settings from disk or create default if not exists
    pub async fn load(&self) -> Result<AppSettings> {
        if !self.settings_path.exists() {
            tracing::info!("Settings file not found, creating default settings");
            let default = AppSettings::default();
            self.save(&default).await?;
            return Ok(default);
        }

        let content = fs::read_to_string(&self.settings_path).await?;
        let settings: AppSettings = serde_json::from_str(&content)
            .map_err(|e| AppError::Generic(format!("Failed to parse settings: {}", e)))?;

        Ok(settings)
    }

    /// Save settings to disk
    pub async fn save(&self, settings: &AppSettings) -> Result<()> {
        if let Some(parent) = self.settings_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(settings)
            .map_err(|e| AppError::Generic(format!("Failed to serialize settings: {}", e)))?;

        fs::write(&self.settings_path, content).await?;
        tracing::info!("Settings saved to {:?}", self.settings_path);

        Ok(())
    }

    pub async fn get_theme(&self) -> Result<Theme> {
        Ok(self.load().await?.theme)
    }

    pub async fn set_theme(&self, theme: Theme) -> Result<()> {
        let mut settings = self.load().await?;
        settings.theme = theme;
        self.save(&settings).await
    }

    /// Flip between light and dark; returns the new theme
    pub async fn toggle_theme(&self) -> Result<Theme> {
        let mut settings = self.load().await?;
        settings.theme = settings.theme.toggled();
        self.save(&settings).await?;
        Ok(settings.theme)
    }

    pub async fn update_remote(&self, remote: RemoteSettings) -> Result<()> {
        let mut settings = self.load().await?;
        settings.remote = remote;
        self.save(&settings).await
    }

    pub async fn set_persistence(&self, preference: PersistencePreference) -> Result<()> {
        let mut settings = self.load().await?;
        settings.persistence = preference;
        self.save(&settings).await
    }

    pub async fn set_offline_auth(&self, policy: OfflineAuthPolicy) -> Result<()> {
        let mut settings = self.load().await?;
        settings.offline_auth = policy;
        self.save(&settings).await
    }

    pub async fn set_remote_suggestions(&self, enabled: bool) -> Result<()> {
        let mut settings = self.load().await?;
        settings.suggestions.use_remote = enabled;
        self.save(&settings).await
    }
}
