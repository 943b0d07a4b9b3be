//! Goal commands
//!
//! CRUD, progress logging, history and summaries for the signed-in user.

use super::{describe_id, loaded_goal_store};
use crate::app::AppState;
use crate::database::{Goal, GoalType, GoalUpdate, NewGoal, ProgressLogEntry};
use crate::error::{AppError, Result};
use crate::services::goals::GoalSummary;
use crate::services::streaks::Streak;
use serde::Serialize;

/// A goal with its derived figures
#[derive(Debug, Clone, Serialize)]
pub struct GoalOverview {
    #[serde(flatten)]
    pub goal: Goal,
    pub progress_percentage: i64,
    pub streak: Streak,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub summary: GoalSummary,
    pub daily_streak: u32,
    pub total_streak: u32,
    pub goals: Vec<GoalOverview>,
}

/// List goals, optionally only active goals of one type
pub async fn list_goals(
    state: &AppState,
    goal_type: Option<GoalType>,
) -> Result<Vec<GoalOverview>> {
    let store = loaded_goal_store(state).await?;

    let goals: Vec<&Goal> = match goal_type {
        Some(goal_type) => store.get_goals_by_type(goal_type),
        None => store.goals().iter().collect(),
    };

    Ok(goals
        .into_iter()
        .map(|goal| GoalOverview {
            progress_percentage: goal.progress_percentage(),
            streak: store.streak(&goal.id),
            goal: goal.clone(),
        })
        .collect())
}

pub async fn get_goal(state: &AppState, id: &str) -> Result<GoalOverview> {
    let store = loaded_goal_store(state).await?;
    let goal = store
        .get_goal_by_id(id)
        .ok_or_else(|| AppError::GoalNotFound(describe_id(id)))?;

    Ok(GoalOverview {
        progress_percentage: goal.progress_percentage(),
        streak: store.streak(&goal.id),
        goal: goal.clone(),
    })
}

pub async fn create_goal(state: &AppState, goal: NewGoal) -> Result<Goal> {
    let mut store = loaded_goal_store(state).await?;
    store.create_goal(goal).await
}

/// Apply a partial update. `None` when the goal does not exist in the local
/// store; the stored goals are untouched then.
pub async fn update_goal(
    state: &AppState,
    id: &str,
    update: GoalUpdate,
) -> Result<Option<Goal>> {
    if update.is_empty() {
        return Err(AppError::Validation("Nothing to update".to_string()));
    }

    let mut store = loaded_goal_store(state).await?;
    store.update_goal(id, update).await
}

pub async fn log_progress(
    state: &AppState,
    id: &str,
    value: i64,
    notes: Option<String>,
) -> Result<Option<Goal>> {
    let mut store = loaded_goal_store(state).await?;
    store.log_progress(id, value, notes).await
}

pub async fn complete_goal(state: &AppState, id: &str) -> Result<Option<Goal>> {
    let mut store = loaded_goal_store(state).await?;
    store.complete_goal(id).await
}

/// Progress entries, all goals or one
pub async fn progress_history(
    state: &AppState,
    id: Option<&str>,
) -> Result<Vec<ProgressLogEntry>> {
    let store = loaded_goal_store(state).await?;
    let goal_id = match id {
        Some(id) => Some(
            store
                .get_goal_by_id(id)
                .map(|goal| goal.id)
                .ok_or_else(|| AppError::GoalNotFound(describe_id(id)))?,
        ),
        None => None,
    };

    store.progress_history(goal_id).await
}

pub async fn dashboard(state: &AppState) -> Result<Dashboard> {
    let store = loaded_goal_store(state).await?;

    Ok(Dashboard {
        summary: store.summary(),
        daily_streak: store.daily_streak(),
        total_streak: store.total_streak(),
        goals: store
            .goals()
            .iter()
            .filter(|goal| goal.is_active())
            .map(|goal| GoalOverview {
                progress_percentage: goal.progress_percentage(),
                streak: store.streak(&goal.id),
                goal: goal.clone(),
            })
            .collect(),
    })
}
