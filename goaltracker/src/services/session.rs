//! Identity and session manager
//!
//! Owns the signed-in user and the repositories chosen for the session.
//! `initialize` provisions the remote schema once; its outcome fixes the
//! persistence mode until the manager is dropped. The session record lives in
//! the local store under `goalTracker_user` so it survives restarts in both
//! modes.

use super::goals::GoalStore;
use super::micro_goals::MicroGoalService;
use super::partners::{is_valid_email, PartnerService};
use super::reflections::ReflectionService;
use super::settings::{OfflineAuthPolicy, PersistencePreference};
use crate::config::{DEFAULT_REMOTE_SCHEMA, ENTITY_USER};
use crate::crypto;
use crate::database::{LocalStore, RecordId, User, UserUpdate};
use crate::error::{AppError, Result};
use crate::remote::{initialize_remote, QueryExecutor};
use crate::repository::{LocalRepository, PersistenceMode, Repositories, UserRepository};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Uninitialized,
    Initializing,
    Ready,
}

/// Session options taken from the settings file
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub schema: String,
    pub persistence: PersistencePreference,
    pub offline_auth: OfflineAuthPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            schema: DEFAULT_REMOTE_SCHEMA.to_string(),
            persistence: PersistencePreference::default(),
            offline_auth: OfflineAuthPolicy::default(),
        }
    }
}

pub struct SessionManager {
    state: SessionState,
    config: SessionConfig,
    executor: Arc<dyn QueryExecutor>,
    store: LocalStore,
    accounts: LocalRepository,
    db_initialized: bool,
    repositories: Option<Repositories>,
    user: Option<User>,
}

fn validate_credentials(email: &str, password: &str) -> Result<()> {
    if !is_valid_email(email) {
        return Err(AppError::Validation(format!("Invalid email: {}", email.trim())));
    }
    if password.is_empty() {
        return Err(AppError::Validation("Password cannot be empty".to_string()));
    }
    Ok(())
}

/// User synthesized by demo-mode authentication
fn demo_user(email: &str, name: Option<&str>) -> User {
    let email = email.trim();
    let name = name
        .map(str::to_string)
        .unwrap_or_else(|| email.split('@').next().unwrap_or(email).to_string());

    User {
        id: RecordId::from_timestamp(Utc::now()),
        email: email.to_string(),
        name,
        onboarding_completed: false,
    }
}

impl SessionManager {
    pub fn new(executor: Arc<dyn QueryExecutor>, store: LocalStore, config: SessionConfig) -> Self {
        Self {
            state: SessionState::Uninitialized,
            config,
            executor,
            accounts: LocalRepository::new(store.clone()),
            store,
            db_initialized: false,
            repositories: None,
            user: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether remote provisioning succeeded during `initialize`
    pub fn db_initialized(&self) -> bool {
        self.db_initialized
    }

    pub fn mode(&self) -> PersistenceMode {
        PersistenceMode::from_initialized(self.db_initialized)
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn require_user(&self) -> Result<&User> {
        self.user.as_ref().ok_or(AppError::NotAuthenticated)
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn repositories(&self) -> Result<&Repositories> {
        self.repositories
            .as_ref()
            .ok_or_else(|| AppError::Generic("Session is not initialized".to_string()))
    }

    fn session_key(&self) -> String {
        self.store.global_key(ENTITY_USER)
    }

    /// Provision the remote schema, pick the persistence mode and restore any
    /// saved session. A saved session that cannot be parsed is removed.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.state == SessionState::Ready {
            return Ok(());
        }
        self.state = SessionState::Initializing;

        self.db_initialized = match self.config.persistence {
            PersistencePreference::Local => {
                tracing::info!("Remote persistence disabled by settings");
                false
            }
            PersistencePreference::Auto | PersistencePreference::Remote => {
                match initialize_remote(self.executor.as_ref(), &self.config.schema).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!("Remote initialization failed: {}", e);
                        false
                    }
                }
            }
        };

        if self.config.persistence == PersistencePreference::Remote && !self.db_initialized {
            self.state = SessionState::Uninitialized;
            return Err(AppError::Remote(
                "Remote persistence is required but could not be initialized".to_string(),
            ));
        }

        let mode = self.mode();
        self.repositories = Some(Repositories::for_mode(
            mode,
            self.executor.clone(),
            &self.config.schema,
            self.store.clone(),
        ));
        tracing::info!("Session using {} persistence", mode);

        self.user = self.restore_session().await;
        self.state = SessionState::Ready;
        Ok(())
    }

    async fn restore_session(&self) -> Option<User> {
        let key = self.session_key();
        let raw = self.store.read_raw(&key).await?;

        match serde_json::from_str::<User>(&raw) {
            Ok(user) => {
                tracing::info!("Restored session for user {}", user.id);
                Some(user)
            }
            Err(e) => {
                tracing::error!("Saved session is corrupt, signing out: {}", e);
                self.store.remove(&key).await;
                None
            }
        }
    }

    async fn start_session(&mut self, user: User) -> User {
        self.store.write(&self.session_key(), &user).await;
        tracing::info!("Signed in as user {}", user.id);
        self.user = Some(user.clone());
        user
    }

    fn ensure_ready(&self) -> Result<()> {
        if self.state != SessionState::Ready {
            return Err(AppError::Generic("Session is not initialized".to_string()));
        }
        Ok(())
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<User> {
        self.ensure_ready()?;
        validate_credentials(email, password)?;
        let email = email.trim();

        if self.db_initialized {
            let users = self.repositories()?.users.clone();
            match users.find_by_email(email).await {
                Ok(Some(account)) => {
                    if !crypto::verify_password(password, &account.password_hash) {
                        return Err(AppError::InvalidCredentials);
                    }
                    return Ok(self.start_session(account.user).await);
                }
                Ok(None) => tracing::info!("No remote account for login, trying local accounts"),
                Err(e) => tracing::warn!("Remote login failed, trying local accounts: {}", e),
            }
        }

        let user = match self.config.offline_auth {
            OfflineAuthPolicy::Demo => demo_user(email, None),
            OfflineAuthPolicy::Verified => {
                let account = self
                    .accounts
                    .find_by_email(email)
                    .await?
                    .ok_or(AppError::InvalidCredentials)?;
                if !crypto::verify_password(password, &account.password_hash) {
                    return Err(AppError::InvalidCredentials);
                }
                account.user
            }
        };

        Ok(self.start_session(user).await)
    }

    pub async fn register(&mut self, name: &str, email: &str, password: &str) -> Result<User> {
        self.ensure_ready()?;
        validate_credentials(email, password)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Name cannot be empty".to_string()));
        }
        let email = email.trim();

        if self.db_initialized {
            let hash = crypto::hash_password(password)?;
            let users = self.repositories()?.users.clone();
            match users.create_user(name, email, &hash).await {
                Ok(user) => return Ok(self.start_session(user).await),
                Err(e) => tracing::warn!("Remote registration failed, registering locally: {}", e),
            }
        }

        let user = match self.config.offline_auth {
            OfflineAuthPolicy::Demo => demo_user(email, Some(name)),
            OfflineAuthPolicy::Verified => {
                let hash = crypto::hash_password(password)?;
                self.accounts.create_user(name, email, &hash).await?
            }
        };

        Ok(self.start_session(user).await)
    }

    pub async fn logout(&mut self) {
        if let Some(user) = self.user.take() {
            tracing::info!("Signed out user {}", user.id);
        }
        self.store.remove(&self.session_key()).await;
    }

    /// Merge `update` into the session user. Remote write failures are
    /// logged; the merged session is always saved.
    pub async fn update_user(&mut self, update: UserUpdate) -> Result<User> {
        let current = self.require_user()?.clone();
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(AppError::Validation("Name cannot be empty".to_string()));
            }
        }

        let mut merged = current.clone();
        update.apply_to(&mut merged);

        let users = self.repositories()?.users.clone();
        if let Err(e) = users.update_user(&current, &update).await {
            tracing::warn!("Could not write user update through: {}", e);
        }

        Ok(self.start_session(merged).await)
    }

    /// Goal store for the signed-in user
    pub fn goal_store(&self) -> Result<GoalStore> {
        let user = self.require_user()?;
        Ok(GoalStore::new(user.id, self.repositories()?.goals.clone()))
    }

    pub fn micro_goals(&self) -> Result<MicroGoalService> {
        self.require_user()?;
        Ok(MicroGoalService::new(self.repositories()?.micro_goals.clone()))
    }

    pub fn partners(&self) -> Result<PartnerService> {
        let user = self.require_user()?;
        Ok(PartnerService::new(user.id, self.repositories()?.partners.clone()))
    }

    pub fn reflections(&self) -> Result<ReflectionService> {
        let user = self.require_user()?;
        Ok(ReflectionService::new(
            user.id,
            self.repositories()?.reflections.clone(),
            self.store.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::local_store::tests::create_test_store;
    use crate::remote::testing::FakeExecutor;
    use crate::remote::DisconnectedExecutor;
    use serde_json::json;

    async fn local_session(offline_auth: OfflineAuthPolicy) -> SessionManager {
        let config = SessionConfig {
            offline_auth,
            ..SessionConfig::default()
        };
        let mut session =
            SessionManager::new(Arc::new(DisconnectedExecutor), create_test_store().await, config);
        session.initialize().await.unwrap();
        session
    }

    #[tokio::test]
    async fn test_failed_remote_init_selects_local_mode() {
        let session = local_session(OfflineAuthPolicy::Verified).await;

        assert_eq!(session.state(), SessionState::Ready);
        assert!(!session.db_initialized());
        assert_eq!(session.mode(), PersistenceMode::Local);
        assert!(session.user().is_none());
    }

    #[tokio::test]
    async fn test_remote_required_but_unavailable() {
        let config = SessionConfig {
            persistence: PersistencePreference::Remote,
            ..SessionConfig::default()
        };
        let mut session =
            SessionManager::new(Arc::new(DisconnectedExecutor), create_test_store().await, config);

        assert!(session.initialize().await.is_err());
        assert_eq!(session.state(), SessionState::Uninitialized);
    }

    #[tokio::test]
    async fn test_local_preference_skips_remote() {
        let executor = Arc::new(FakeExecutor::empty());
        let config = SessionConfig {
            persistence: PersistencePreference::Local,
            ..SessionConfig::default()
        };
        let mut session = SessionManager::new(executor.clone(), create_test_store().await, config);
        session.initialize().await.unwrap();

        assert!(executor.calls().is_empty());
        assert_eq!(session.mode(), PersistenceMode::Local);
    }

    #[tokio::test]
    async fn test_verified_register_then_login() {
        let mut session = local_session(OfflineAuthPolicy::Verified).await;

        let user = session.register("Ada", "ada@example.com", "secret").await.unwrap();
        assert_eq!(user.name, "Ada");

        session.logout().await;
        assert!(session.user().is_none());

        assert!(matches!(
            session.login("ada@example.com", "wrong").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            session.login("nobody@example.com", "secret").await,
            Err(AppError::InvalidCredentials)
        ));

        let again = session.login("ADA@example.com", "secret").await.unwrap();
        assert_eq!(again.id, user.id);
    }

    #[tokio::test]
    async fn test_duplicate_local_registration_rejected() {
        let mut session = local_session(OfflineAuthPolicy::Verified).await;
        session.register("Ada", "ada@example.com", "secret").await.unwrap();

        assert!(session.register("Ada", "ada@example.com", "other").await.is_err());
    }

    #[tokio::test]
    async fn test_demo_login_synthesizes_user() {
        let mut session = local_session(OfflineAuthPolicy::Demo).await;

        let user = session.login("grace@example.com", "anything").await.unwrap();
        assert_eq!(user.name, "grace");
        assert!(user.id.get() > 1_000_000_000_000);
        assert!(!user.onboarding_completed);
    }

    #[tokio::test]
    async fn test_session_restored_and_corrupt_record_purged() {
        let store = create_test_store().await;

        let mut first = SessionManager::new(
            Arc::new(DisconnectedExecutor),
            store.clone(),
            SessionConfig::default(),
        );
        first.initialize().await.unwrap();
        let user = first.register("Ada", "ada@example.com", "secret").await.unwrap();

        let mut second = SessionManager::new(
            Arc::new(DisconnectedExecutor),
            store.clone(),
            SessionConfig::default(),
        );
        second.initialize().await.unwrap();
        assert_eq!(second.user(), Some(&user));

        store.write(&store.global_key("user"), "not a user").await;
        let mut third = SessionManager::new(
            Arc::new(DisconnectedExecutor),
            store.clone(),
            SessionConfig::default(),
        );
        third.initialize().await.unwrap();
        assert!(third.user().is_none());
        assert!(!store.exists(&store.global_key("user")).await);
    }

    #[tokio::test]
    async fn test_update_user_persists_session() {
        let mut session = local_session(OfflineAuthPolicy::Verified).await;
        session.register("Ada", "ada@example.com", "secret").await.unwrap();

        let updated = session
            .update_user(UserUpdate {
                name: Some("Ada L".to_string()),
                onboarding_completed: Some(true),
            })
            .await
            .unwrap();
        assert_eq!(updated.name, "Ada L");
        assert!(updated.onboarding_completed);

        let saved: User = session.store().read(&session.store().global_key("user")).await.unwrap();
        assert_eq!(saved, updated);
        assert!(session.update_user(UserUpdate {
            name: Some(" ".to_string()),
            onboarding_completed: None,
        })
        .await
        .is_err());
    }

    #[tokio::test]
    async fn test_operations_require_login() {
        let mut session = local_session(OfflineAuthPolicy::Verified).await;

        assert!(matches!(session.goal_store(), Err(AppError::NotAuthenticated)));
        assert!(session.update_user(UserUpdate::default()).await.is_err());
        assert!(session.login("bad-email", "x").await.is_err());
    }

    #[tokio::test]
    async fn test_remote_login_verifies_hash() {
        let hash = crypto::hash_password("secret").unwrap();
        let executor = Arc::new(FakeExecutor::new(move |sql, _| {
            if sql.contains("FROM goaltracker.users") {
                Ok(vec![json!({
                    "id": 41,
                    "email": "ada@example.com",
                    "name": "Ada",
                    "password_hash": hash,
                    "onboarding_completed": "t",
                    "created_at": "2024-01-01 10:00:00"
                })])
            } else {
                Ok(Vec::new())
            }
        }));

        let mut session =
            SessionManager::new(executor, create_test_store().await, SessionConfig::default());
        session.initialize().await.unwrap();
        assert_eq!(session.mode(), PersistenceMode::Remote);

        let user = session.login("ada@example.com", "secret").await.unwrap();
        assert_eq!(user.id, RecordId::new(41));
        assert!(user.onboarding_completed);

        assert!(matches!(
            session.login("ada@example.com", "nope").await,
            Err(AppError::InvalidCredentials)
        ));
    }
}
