//! Secrets vault commands

use crate::app::AppState;
use crate::config::ENV_VAULT_KEY;
use crate::error::{AppError, Result};
use crate::services::SecretsVault;

fn vault(state: &AppState) -> Result<&SecretsVault> {
    state.vault.as_ref().ok_or_else(|| {
        AppError::Generic(format!("Secrets vault is locked; set {} to unlock it", ENV_VAULT_KEY))
    })
}

pub async fn set_secret(state: &AppState, name: &str, value: &str) -> Result<()> {
    vault(state)?.set(name, value).await
}

/// Returns whether the secret existed
pub async fn remove_secret(state: &AppState, name: &str) -> Result<bool> {
    vault(state)?.remove(name).await
}

/// Names of stored secrets; values are never listed
pub async fn list_secrets(state: &AppState) -> Result<Vec<String>> {
    vault(state)?.names().await
}
