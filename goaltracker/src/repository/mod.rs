//! Repository layer
//!
//! Each entity has a repository trait with two implementations: `remote`
//! (queries through the persistence adapter) and `local` (the namespaced
//! fallback store). The session picks one `PersistenceMode` at startup and
//! every repository in the bundle follows it for the rest of the session.

pub mod local;
pub mod remote;

pub use local::LocalRepository;
pub use remote::RemoteRepository;

use crate::database::{
    AccountabilityPartner, Goal, GoalId, GoalUpdate, LocalStore, MicroGoal, MicroGoalUpdate,
    NewGoal, NewMicroGoal, NewPartner, ProgressLogEntry, RecordId, Reflection, StoredAccount,
    User, UserId, UserUpdate,
};
use crate::error::Result;
use crate::remote::QueryExecutor;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Backend selected for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceMode {
    Remote,
    Local,
}

impl PersistenceMode {
    /// Remote when the adapter initialized, otherwise the local fallback
    pub fn from_initialized(db_initialized: bool) -> Self {
        if db_initialized {
            PersistenceMode::Remote
        } else {
            PersistenceMode::Local
        }
    }
}

impl fmt::Display for PersistenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceMode::Remote => f.write_str("remote"),
            PersistenceMode::Local => f.write_str("local"),
        }
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<User>;

    async fn find_by_email(&self, email: &str) -> Result<Option<StoredAccount>>;

    /// Persist `update` for `user` and return the merged record
    async fn update_user(&self, user: &User, update: &UserUpdate) -> Result<User>;
}

#[async_trait]
pub trait GoalRepository: Send + Sync {
    fn mode(&self) -> PersistenceMode;

    /// All goals of a user, most recently created first
    async fn list_goals(&self, user_id: UserId) -> Result<Vec<Goal>>;

    async fn insert_goal(&self, user_id: UserId, goal: NewGoal) -> Result<Goal>;

    /// Merge `update` into a goal the user owns; `None` when there is no such goal
    async fn update_goal(
        &self,
        user_id: UserId,
        goal_id: GoalId,
        update: &GoalUpdate,
    ) -> Result<Option<Goal>>;

    /// Append a log entry, then add `value` to the goal's aggregate.
    ///
    /// `None` when the user owns no such goal; nothing is written then.
    /// When the entry is stored but the aggregate write fails the result is
    /// `AppError::PartialWrite`.
    async fn log_progress(
        &self,
        user_id: UserId,
        goal_id: GoalId,
        value: i64,
        notes: Option<String>,
        logged_date: NaiveDate,
    ) -> Result<Option<(ProgressLogEntry, Goal)>>;

    /// Progress entries of a user, optionally restricted to one goal
    async fn list_progress(
        &self,
        user_id: UserId,
        goal_id: Option<GoalId>,
    ) -> Result<Vec<ProgressLogEntry>>;
}

#[async_trait]
pub trait MicroGoalRepository: Send + Sync {
    /// Ordered by `order_index`, then creation time
    async fn list_micro_goals(&self, goal_id: GoalId) -> Result<Vec<MicroGoal>>;

    async fn insert_micro_goal(&self, goal_id: GoalId, micro_goal: NewMicroGoal)
        -> Result<MicroGoal>;

    async fn update_micro_goal(
        &self,
        goal_id: GoalId,
        micro_goal_id: RecordId,
        update: &MicroGoalUpdate,
    ) -> Result<MicroGoal>;

    async fn delete_micro_goal(&self, goal_id: GoalId, micro_goal_id: RecordId) -> Result<()>;
}

#[async_trait]
pub trait PartnerRepository: Send + Sync {
    /// Active partners, most recent first
    async fn list_partners(&self, user_id: UserId) -> Result<Vec<AccountabilityPartner>>;

    async fn insert_partner(
        &self,
        user_id: UserId,
        partner: NewPartner,
    ) -> Result<AccountabilityPartner>;
}

#[async_trait]
pub trait ReflectionRepository: Send + Sync {
    /// Most recent first, at most `limit`
    async fn list_reflections(&self, user_id: UserId, limit: i64) -> Result<Vec<Reflection>>;

    async fn insert_reflection(
        &self,
        user_id: UserId,
        prompt: &str,
        response: &str,
    ) -> Result<Reflection>;
}

/// Repositories for one persistence mode
#[derive(Clone)]
pub struct Repositories {
    pub mode: PersistenceMode,
    pub users: Arc<dyn UserRepository>,
    pub goals: Arc<dyn GoalRepository>,
    pub micro_goals: Arc<dyn MicroGoalRepository>,
    pub partners: Arc<dyn PartnerRepository>,
    pub reflections: Arc<dyn ReflectionRepository>,
}

impl Repositories {
    pub fn remote(executor: Arc<dyn QueryExecutor>, schema: &str) -> Self {
        let repository = Arc::new(RemoteRepository::new(executor, schema));
        Self {
            mode: PersistenceMode::Remote,
            users: repository.clone(),
            goals: repository.clone(),
            micro_goals: repository.clone(),
            partners: repository.clone(),
            reflections: repository,
        }
    }

    pub fn local(store: LocalStore) -> Self {
        let repository = Arc::new(LocalRepository::new(store));
        Self {
            mode: PersistenceMode::Local,
            users: repository.clone(),
            goals: repository.clone(),
            micro_goals: repository.clone(),
            partners: repository.clone(),
            reflections: repository,
        }
    }

    pub fn for_mode(
        mode: PersistenceMode,
        executor: Arc<dyn QueryExecutor>,
        schema: &str,
        store: LocalStore,
    ) -> Self {
        match mode {
            PersistenceMode::Remote => Self::remote(executor, schema),
            PersistenceMode::Local => Self::local(store),
        }
    }
}
