//! Micro goal commands

use super::owned_goal;
use crate::app::AppState;
use crate::database::{MicroGoal, NewMicroGoal};
use crate::error::Result;
use crate::services::micro_goals::CompletionRatio;
use chrono::Local;

pub async fn list_micro_goals(state: &AppState, goal_id: &str) -> Result<Vec<MicroGoal>> {
    let goal = owned_goal(state, goal_id).await?;
    state.session.micro_goals()?.list(&goal).await
}

pub async fn create_micro_goal(
    state: &AppState,
    goal_id: &str,
    micro_goal: NewMicroGoal,
) -> Result<MicroGoal> {
    let goal = owned_goal(state, goal_id).await?;
    state.session.micro_goals()?.create(&goal, micro_goal).await
}

/// Generate a staged breakdown for a goal and store it
pub async fn generate_micro_goals(state: &AppState, goal_id: &str) -> Result<Vec<MicroGoal>> {
    let goal = owned_goal(state, goal_id).await?;
    let plan = state
        .suggestions
        .micro_goals(&goal, Local::now().date_naive())
        .await;

    state.session.micro_goals()?.create_batch(&goal, plan).await
}

pub async fn toggle_micro_goal(
    state: &AppState,
    goal_id: &str,
    micro_goal_id: &str,
) -> Result<MicroGoal> {
    let goal = owned_goal(state, goal_id).await?;
    state
        .session
        .micro_goals()?
        .toggle(&goal, micro_goal_id)
        .await
}

pub async fn delete_micro_goal(state: &AppState, goal_id: &str, micro_goal_id: &str) -> Result<()> {
    let goal = owned_goal(state, goal_id).await?;
    state
        .session
        .micro_goals()?
        .delete(&goal, micro_goal_id)
        .await
}

pub async fn micro_goal_progress(state: &AppState, goal_id: &str) -> Result<CompletionRatio> {
    let goal = owned_goal(state, goal_id).await?;
    state.session.micro_goals()?.completion(&goal).await
}
