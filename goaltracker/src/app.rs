//! Application state and initialization
//!
//! This module manages the central application state and lifecycle.
//! All services are initialized here and made available through AppState.

use crate::database::{create_pool, LocalStore};
use crate::error::{AppError, Result};
use crate::remote::{DisconnectedExecutor, HttpPersistence, PromptClient, QueryExecutor};
use crate::services::secrets::{resolve_credentials, SecretsVault};
use crate::services::session::{SessionConfig, SessionManager};
use crate::services::settings::{AppSettings, SettingsService};
use crate::services::suggestions::SuggestionService;
use directories::ProjectDirs;
use std::path::PathBuf;
use std::sync::Arc;

/// File name of the local fallback database inside the data directory
pub const DATABASE_FILE: &str = "goaltracker.db";

/// Central application state holding all services
pub struct AppState {
    pub app_data_dir: PathBuf,
    pub settings: SettingsService,
    pub store: LocalStore,
    pub vault: Option<SecretsVault>,
    pub session: SessionManager,
    pub suggestions: SuggestionService,
}

/// Platform data directory for the application
pub fn default_data_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", "goaltracker")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| AppError::Generic("Failed to get app data dir".to_string()))
}

impl AppState {
    /// Application setup - called once on startup
    pub async fn setup(app_data_dir: PathBuf) -> Result<Self> {
        tracing::info!("Initializing application");
        tracing::info!("App data directory: {:?}", app_data_dir);

        std::fs::create_dir_all(&app_data_dir)?;

        let settings_service = SettingsService::new(app_data_dir.clone());
        let settings = settings_service.load().await?;

        let pool = create_pool(&app_data_dir.join(DATABASE_FILE)).await?;
        let store = LocalStore::new(pool);

        let vault = SecretsVault::from_env(app_data_dir.clone());
        let (executor, prompts) = Self::remote_clients(&settings, vault.as_ref()).await?;

        let mut session = SessionManager::new(
            executor,
            store.clone(),
            SessionConfig {
                schema: settings.remote.schema.clone(),
                persistence: settings.persistence,
                offline_auth: settings.offline_auth,
            },
        );
        session.initialize().await?;

        let suggestions = match prompts {
            Some(client) if settings.suggestions.use_remote => {
                SuggestionService::with_prompts(client)
            }
            _ => SuggestionService::local(),
        };

        tracing::info!("Application initialized successfully");

        Ok(Self {
            app_data_dir,
            settings: settings_service,
            store,
            vault,
            session,
            suggestions,
        })
    }

    /// Persistence adapter and prompt client for the configured remote.
    /// Without credentials every query fails, which selects fallback mode.
    async fn remote_clients(
        settings: &AppSettings,
        vault: Option<&SecretsVault>,
    ) -> Result<(Arc<dyn QueryExecutor>, Option<PromptClient>)> {
        if !settings.remote.enabled {
            tracing::info!("Remote backend disabled in settings");
            return Ok((Arc::new(DisconnectedExecutor), None));
        }

        match resolve_credentials(vault).await {
            Some(credentials) => {
                let base_url = &settings.remote.base_url;
                let executor = HttpPersistence::new(base_url, credentials.clone())?;
                let prompts = PromptClient::new(base_url, credentials)?;
                Ok((Arc::new(executor), Some(prompts)))
            }
            None => {
                tracing::warn!("No remote credentials configured, using local storage");
                Ok((Arc::new(DisconnectedExecutor), None))
            }
        }
    }

    /// Release the local database
    pub async fn shutdown(self) {
        tracing::info!("Shutting down");
        self.store.close().await;
    }
}
