//! Secrets vault
//!
//! Remote credentials are read from the environment first and then from an
//! encrypted vault file (`secrets.enc`) in the data directory. The vault holds
//! a JSON map of names to values, encrypted with the vault password.

use crate::config::{ENV_API_TOKEN, ENV_APP_ID, ENV_USAGE_KEY, ENV_VAULT_KEY};
use crate::crypto::{self, EncryptedData};
use crate::error::{AppError, Result};
use crate::remote::RemoteCredentials;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::fs;

pub const SECRET_API_TOKEN: &str = "api_token";
pub const SECRET_APP_ID: &str = "app_id";
pub const SECRET_USAGE_KEY: &str = "usage_key";

/// Encrypted name/value store on disk
#[derive(Clone)]
pub struct SecretsVault {
    path: PathBuf,
    password: String,
}

impl SecretsVault {
    pub fn new(app_data_dir: PathBuf, password: impl Into<String>) -> Self {
        Self {
            path: app_data_dir.join("secrets.enc"),
            password: password.into(),
        }
    }

    /// Vault unlocked with the password from the environment, if set
    pub fn from_env(app_data_dir: PathBuf) -> Option<Self> {
        std::env::var(ENV_VAULT_KEY)
            .ok()
            .filter(|key| !key.is_empty())
            .map(|key| Self::new(app_data_dir, key))
    }

    /// All stored secrets; a missing vault is empty
    pub async fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read(&self.path).await?;
        let encrypted: EncryptedData = serde_json::from_slice(&content)?;
        let plaintext = crypto::decrypt(&encrypted, &self.password)?;

        Ok(serde_json::from_slice(&plaintext)?)
    }

    async fn save(&self, secrets: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let plaintext = serde_json::to_vec(secrets)?;
        let encrypted = crypto::encrypt(&plaintext, &self.password)?;
        fs::write(&self.path, serde_json::to_vec(&encrypted)?).await?;

        tracing::info!("Secrets vault saved ({} entries)", secrets.len());
        Ok(())
    }

    pub async fn get(&self, name: &str) -> Result<Option<String>> {
        Ok(self.load().await?.remove(name))
    }

    pub async fn set(&self, name: &str, value: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(AppError::Validation("Secret name cannot be empty".to_string()));
        }

        let mut secrets = self.load().await?;
        secrets.insert(name.to_string(), value.to_string());
        self.save(&secrets).await
    }

    /// Returns whether the secret existed
    pub async fn remove(&self, name: &str) -> Result<bool> {
        let mut secrets = self.load().await?;
        let existed = secrets.remove(name).is_some();
        if existed {
            self.save(&secrets).await?;
        }
        Ok(existed)
    }

    pub async fn names(&self) -> Result<Vec<String>> {
        Ok(self.load().await?.into_keys().collect())
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Credentials from the environment, falling back to the vault.
///
/// Returns `None` when any of the three values is missing from both.
pub async fn resolve_credentials(vault: Option<&SecretsVault>) -> Option<RemoteCredentials> {
    let stored = match vault {
        Some(vault) => vault.load().await.unwrap_or_else(|e| {
            tracing::warn!("Could not open secrets vault: {}", e);
            BTreeMap::new()
        }),
        None => BTreeMap::new(),
    };

    let lookup = |env: &str, secret: &str| env_value(env).or_else(|| stored.get(secret).cloned());

    Some(RemoteCredentials {
        bearer_token: lookup(ENV_API_TOKEN, SECRET_API_TOKEN)?,
        app_id: lookup(ENV_APP_ID, SECRET_APP_ID)?,
        usage_key: lookup(ENV_USAGE_KEY, SECRET_USAGE_KEY)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_set_get_remove() {
        let temp = TempDir::new().unwrap();
        let vault = SecretsVault::new(temp.path().to_path_buf(), "vault-pass");

        assert!(vault.get(SECRET_APP_ID).await.unwrap().is_none());

        vault.set(SECRET_APP_ID, "app-1").await.unwrap();
        vault.set(SECRET_USAGE_KEY, "usage-1").await.unwrap();
        assert_eq!(vault.get(SECRET_APP_ID).await.unwrap().as_deref(), Some("app-1"));
        assert_eq!(vault.names().await.unwrap(), vec!["app_id", "usage_key"]);

        assert!(vault.remove(SECRET_APP_ID).await.unwrap());
        assert!(!vault.remove(SECRET_APP_ID).await.unwrap());
    }

    #[tokio::test]
    async fn test_vault_is_encrypted_at_rest() {
        let temp = TempDir::new().unwrap();
        let vault = SecretsVault::new(temp.path().to_path_buf(), "vault-pass");
        vault.set(SECRET_API_TOKEN, "very-secret-token").await.unwrap();

        let raw = std::fs::read_to_string(temp.path().join("secrets.enc")).unwrap();
        assert!(!raw.contains("very-secret-token"));

        let wrong = SecretsVault::new(temp.path().to_path_buf(), "other-pass");
        assert!(wrong.load().await.is_err());
    }

    #[tokio::test]
    async fn test_credentials_resolve_from_vault() {
        let temp = TempDir::new().unwrap();
        let vault = SecretsVault::new(temp.path().to_path_buf(), "vault-pass");
        vault.set(SECRET_API_TOKEN, "token").await.unwrap();
        vault.set(SECRET_APP_ID, "app").await.unwrap();
        vault.set(SECRET_USAGE_KEY, "usage").await.unwrap();

        assert!(resolve_credentials(Some(&vault)).await.is_some());
    }

    #[tokio::test]
    async fn test_empty_name_is_rejected() {
        let temp = TempDir::new().unwrap();
        let vault = SecretsVault::new(temp.path().to_path_buf(), "vault-pass");

        assert!(vault.set("  ", "x").await.is_err());
    }
}
