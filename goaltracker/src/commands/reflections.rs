//! Reflection commands

use crate::app::AppState;
use crate::database::{GoalType, Reflection};
use crate::error::Result;
use crate::services::suggestions::ReflectionPrompt;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ReflectionStatus {
    pub due: bool,
    pub last_reflected: Option<chrono::DateTime<chrono::Utc>>,
}

pub async fn save_reflection(state: &AppState, prompt: &str, response: &str) -> Result<Reflection> {
    state.session.reflections()?.save(prompt, response).await
}

pub async fn list_reflections(state: &AppState, limit: Option<i64>) -> Result<Vec<Reflection>> {
    state.session.reflections()?.list_recent(limit).await
}

pub async fn reflection_status(state: &AppState) -> Result<ReflectionStatus> {
    let reflections = state.session.reflections()?;
    Ok(ReflectionStatus {
        due: reflections.is_due().await,
        last_reflected: reflections.last_reflected().await,
    })
}

pub async fn reflection_prompts(
    state: &AppState,
    goal_type: Option<GoalType>,
) -> Result<Vec<ReflectionPrompt>> {
    state.session.require_user()?;
    let mut rng = StdRng::from_entropy();
    Ok(state.suggestions.reflection_prompts(goal_type, &mut rng).await)
}
