//! Settings-related commands
//!
//! Theme, persistence preference, offline authentication policy and remote
//! backend configuration. Persistence and remote changes apply on the next
//! start, since the session picks its backend once.

use crate::app::AppState;
use crate::error::{AppError, Result};
use crate::remote::schema::validate_schema_name;
use crate::services::settings::{
    AppSettings, OfflineAuthPolicy, PersistencePreference, RemoteSettings, Theme,
};

pub async fn get_settings(state: &AppState) -> Result<AppSettings> {
    state.settings.load().await
}

// ===== Theme =====

pub async fn get_theme(state: &AppState) -> Result<Theme> {
    state.settings.get_theme().await
}

pub async fn set_theme(state: &AppState, theme: Theme) -> Result<()> {
    state.settings.set_theme(theme).await
}

pub async fn toggle_theme(state: &AppState) -> Result<Theme> {
    state.settings.toggle_theme().await
}

// ===== Backend =====

pub async fn set_persistence(state: &AppState, preference: PersistencePreference) -> Result<()> {
    state.settings.set_persistence(preference).await?;
    tracing::warn!("Persistence preference updated. Restart required for changes to take effect.");
    Ok(())
}

pub async fn set_offline_auth(state: &AppState, policy: OfflineAuthPolicy) -> Result<()> {
    state.settings.set_offline_auth(policy).await?;
    tracing::warn!("Offline authentication updated. Restart required for changes to take effect.");
    Ok(())
}

pub async fn update_remote_settings(
    state: &AppState,
    enabled: Option<bool>,
    base_url: Option<String>,
    schema: Option<String>,
) -> Result<RemoteSettings> {
    let mut remote = state.settings.load().await?.remote;

    if let Some(enabled) = enabled {
        remote.enabled = enabled;
    }
    if let Some(base_url) = base_url {
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(AppError::Validation(format!(
                "Remote URL must start with http:// or https://: {}",
                base_url
            )));
        }
        remote.base_url = base_url;
    }
    if let Some(schema) = schema {
        validate_schema_name(&schema)?;
        remote.schema = schema;
    }

    state.settings.update_remote(remote.clone()).await?;
    Ok(remote)
}

pub async fn set_remote_suggestions(state: &AppState, enabled: bool) -> Result<()> {
    state.settings.set_remote_suggestions(enabled).await
}
