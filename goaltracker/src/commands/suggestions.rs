//! Suggestion commands

use super::{loaded_goal_store, owned_goal};
use crate::app::AppState;
use crate::database::Goal;
use crate::error::Result;
use crate::services::suggestions::{
    history_suggestions, preferred_goal_type, GoalHistory, GoalSuggestion, SuggestionContext,
};
use chrono::Local;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Suggestions for the current time of day and season
pub async fn contextual_suggestions(state: &AppState) -> Result<Vec<GoalSuggestion>> {
    let store = loaded_goal_store(state).await?;
    let mut rng = StdRng::from_entropy();

    Ok(state
        .suggestions
        .contextual(&SuggestionContext::now(), store.goals(), &mut rng)
        .await)
}

/// Suggestions shaped by the user's goal history
pub async fn personalized_suggestions(state: &AppState) -> Result<Vec<GoalSuggestion>> {
    let store = loaded_goal_store(state).await?;
    let goals = store.goals();

    Ok(history_suggestions(
        &GoalHistory::from_goals(goals),
        preferred_goal_type(goals),
    ))
}

pub async fn habit_suggestions(state: &AppState, goal_id: &str) -> Result<Vec<String>> {
    let goal = owned_goal(state, goal_id).await?;
    Ok(state.suggestions.habit_stacking(&goal.title).await)
}

/// Create a goal from a suggestion
pub async fn accept_suggestion(state: &AppState, suggestion: GoalSuggestion) -> Result<Goal> {
    let mut store = loaded_goal_store(state).await?;
    store
        .create_goal(suggestion.to_new_goal(Local::now().date_naive()))
        .await
}

/// Register prompt templates with the remote prompt service
pub async fn setup_prompts(state: &AppState) -> Result<()> {
    state.suggestions.setup().await
}
