//! Commands exposed to the command-line front end
//!
//! This module organizes commands into logical submodules:
//! - `session`: Login, registration and profile
//! - `goals`: Goal CRUD, progress logging and summaries
//! - `micro_goals`: Goal breakdown steps
//! - `partners`: Accountability partners
//! - `reflections`: Reflection prompts and responses
//! - `suggestions`: Goal and habit suggestions
//! - `sharing`: Share links and report export
//! - `settings`: Application settings
//! - `secrets`: Encrypted remote credentials

pub mod goals;
pub mod micro_goals;
pub mod partners;
pub mod reflections;
pub mod secrets;
pub mod session;
pub mod settings;
pub mod sharing;
pub mod suggestions;

use crate::app::AppState;
use crate::database::{AsRecordId, Goal, User};
use crate::error::{AppError, Result};
use crate::repository::PersistenceMode;
use crate::services::GoalStore;

pub use goals::*;
pub use micro_goals::*;
pub use partners::*;
pub use reflections::*;
pub use secrets::*;
pub use session::*;
pub use settings::*;
pub use sharing::*;
pub use suggestions::*;

// ===== General Commands =====

/// Get application information
pub fn get_app_info(state: &AppState) -> AppInfo {
    AppInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        app_data_dir: state.app_data_dir.to_string_lossy().to_string(),
        persistence: state.session.mode(),
        db_initialized: state.session.db_initialized(),
        remote_suggestions: state.suggestions.uses_remote(),
        user: state.session.user().cloned(),
    }
}

/// Application information structure
#[derive(serde::Serialize)]
pub struct AppInfo {
    pub version: String,
    pub app_data_dir: String,
    pub persistence: PersistenceMode,
    pub db_initialized: bool,
    pub remote_suggestions: bool,
    pub user: Option<User>,
}

/// Goal store for the signed-in user with goals loaded
pub(crate) async fn loaded_goal_store(state: &AppState) -> Result<GoalStore> {
    let mut store = state.session.goal_store()?;
    store.load_goals().await;
    Ok(store)
}

/// A goal owned by the signed-in user
pub(crate) async fn owned_goal<I>(state: &AppState, id: &I) -> Result<Goal>
where
    I: AsRecordId + ?Sized,
{
    let store = loaded_goal_store(state).await?;
    store
        .get_goal_by_id(id)
        .cloned()
        .ok_or_else(|| AppError::GoalNotFound(describe_id(id)))
}

pub(crate) fn describe_id<I: AsRecordId + ?Sized>(id: &I) -> String {
    id.as_record_id()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "invalid goal id".to_string())
}
