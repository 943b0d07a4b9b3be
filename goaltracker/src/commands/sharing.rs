//! Sharing commands

use super::{loaded_goal_store, owned_goal};
use crate::app::AppState;
use crate::error::Result;
use crate::services::sharing::{self, ShareAction, SharePlatform};
use chrono::Local;
use std::path::Path;

pub async fn share_goal(
    state: &AppState,
    goal_id: &str,
    platform: SharePlatform,
    url: &str,
) -> Result<ShareAction> {
    let goal = owned_goal(state, goal_id).await?;
    Ok(sharing::share_goal(platform, &goal, url))
}

pub async fn progress_report(state: &AppState) -> Result<String> {
    let store = loaded_goal_store(state).await?;
    Ok(sharing::progress_report(&store, Local::now().date_naive()))
}

pub async fn export_report(state: &AppState, path: &Path) -> Result<()> {
    let store = loaded_goal_store(state).await?;
    sharing::export_report(&store, Local::now().date_naive(), path).await
}
