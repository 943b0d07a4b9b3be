//! Micro goal service
//!
//! Sub-steps of a goal. Callers pass the parent `Goal` they obtained from the
//! user's `GoalStore`, which scopes every operation to a goal the user owns.

use crate::config::MAX_TITLE_LENGTH;
use crate::database::{
    progress_percentage, AsRecordId, Goal, MicroGoal, MicroGoalUpdate, NewMicroGoal,
};
use crate::error::{AppError, Result};
use crate::repository::MicroGoalRepository;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

/// Completed versus total micro goals of one goal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompletionRatio {
    pub completed: usize,
    pub total: usize,
}

impl CompletionRatio {
    pub fn of(micro_goals: &[MicroGoal]) -> Self {
        Self {
            completed: micro_goals.iter().filter(|m| m.completed).count(),
            total: micro_goals.len(),
        }
    }

    pub fn percentage(&self) -> i64 {
        progress_percentage(self.completed as i64, self.total as i64)
    }
}

#[derive(Clone)]
pub struct MicroGoalService {
    repository: Arc<dyn MicroGoalRepository>,
}

fn validate_micro_goal(micro_goal: &NewMicroGoal) -> Result<()> {
    if micro_goal.title.trim().is_empty() {
        return Err(AppError::Validation(
            "Micro goal title cannot be empty".to_string(),
        ));
    }
    if micro_goal.title.chars().count() > MAX_TITLE_LENGTH {
        return Err(AppError::Validation(format!(
            "Micro goal title cannot exceed {} characters",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(())
}

impl MicroGoalService {
    pub fn new(repository: Arc<dyn MicroGoalRepository>) -> Self {
        Self { repository }
    }

    pub async fn list(&self, goal: &Goal) -> Result<Vec<MicroGoal>> {
        self.repository.list_micro_goals(goal.id).await
    }

    pub async fn create(&self, goal: &Goal, micro_goal: NewMicroGoal) -> Result<MicroGoal> {
        validate_micro_goal(&micro_goal)?;

        let created = self.repository.insert_micro_goal(goal.id, micro_goal).await?;
        tracing::info!("Created micro goal {} for goal {}", created.id, goal.id);
        Ok(created)
    }

    /// Store a generated breakdown in order; stops at the first failure
    pub async fn create_batch(
        &self,
        goal: &Goal,
        micro_goals: Vec<NewMicroGoal>,
    ) -> Result<Vec<MicroGoal>> {
        for micro_goal in &micro_goals {
            validate_micro_goal(micro_goal)?;
        }

        let mut created = Vec::with_capacity(micro_goals.len());
        for (index, mut micro_goal) in micro_goals.into_iter().enumerate() {
            micro_goal.order_index.get_or_insert(index as i64);
            created.push(self.repository.insert_micro_goal(goal.id, micro_goal).await?);
        }

        tracing::info!("Created {} micro goals for goal {}", created.len(), goal.id);
        Ok(created)
    }

    /// Flip completion; completing stamps `completed_at`, reopening clears it
    pub async fn toggle<I>(&self, goal: &Goal, micro_goal_id: &I) -> Result<MicroGoal>
    where
        I: AsRecordId + ?Sized,
    {
        let id = micro_goal_id
            .as_record_id()
            .ok_or_else(|| AppError::MicroGoalNotFound("invalid micro goal id".to_string()))?;

        let current = self
            .list(goal)
            .await?
            .into_iter()
            .find(|m| m.id == id)
            .ok_or_else(|| AppError::MicroGoalNotFound(id.to_string()))?;

        let update = MicroGoalUpdate::completion(!current.completed, Utc::now());
        self.repository.update_micro_goal(goal.id, id, &update).await
    }

    pub async fn delete<I>(&self, goal: &Goal, micro_goal_id: &I) -> Result<()>
    where
        I: AsRecordId + ?Sized,
    {
        let id = micro_goal_id
            .as_record_id()
            .ok_or_else(|| AppError::MicroGoalNotFound("invalid micro goal id".to_string()))?;

        self.repository.delete_micro_goal(goal.id, id).await
    }

    pub async fn completion(&self, goal: &Goal) -> Result<CompletionRatio> {
        Ok(CompletionRatio::of(&self.list(goal).await?))
    }
}
