//! Goal store
//!
//! In-memory goal collection for the signed-in user, written through to the
//! repository selected for the session. The collection is ordered most
//! recently created first. Streaks are derived from the progress log and
//! cached per goal.

use super::streaks::{compute_streak, Streak};
use crate::config::{
    MAX_DESCRIPTION_LENGTH, MAX_PROGRESS_INCREMENT, MAX_TARGET_VALUE, MAX_TITLE_LENGTH,
    MIN_TARGET_VALUE,
};
use crate::database::{
    AsRecordId, Goal, GoalId, GoalStatus, GoalType, GoalUpdate, NewGoal, ProgressLogEntry, UserId,
};
use crate::error::{AppError, Result};
use crate::repository::{GoalRepository, PersistenceMode};
use chrono::{Local, NaiveDate, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

/// Dashboard counts over the loaded goals
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GoalSummary {
    pub total: usize,
    pub active: usize,
    pub completed: usize,
    pub active_daily: usize,
    pub active_weekly: usize,
    pub active_yearly: usize,
    /// Mean completion percentage of active goals, each capped at 100
    pub average_progress: i64,
}

pub struct GoalStore {
    user_id: UserId,
    repository: Arc<dyn GoalRepository>,
    goals: Vec<Goal>,
    streaks: HashMap<GoalId, Streak>,
    daily_streak: Streak,
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(AppError::Validation("Title cannot be empty".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(AppError::Validation(format!(
            "Title cannot exceed {} characters",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(())
}

fn validate_description(description: Option<&str>) -> Result<()> {
    match description {
        Some(text) if text.chars().count() > MAX_DESCRIPTION_LENGTH => Err(AppError::Validation(
            format!("Description cannot exceed {} characters", MAX_DESCRIPTION_LENGTH),
        )),
        _ => Ok(()),
    }
}

fn validate_target(target: i64) -> Result<()> {
    if !(MIN_TARGET_VALUE..=MAX_TARGET_VALUE).contains(&target) {
        return Err(AppError::Validation(format!(
            "Target value must be between {} and {}",
            MIN_TARGET_VALUE, MAX_TARGET_VALUE
        )));
    }
    Ok(())
}

fn validate_dates(start: NaiveDate, end: Option<NaiveDate>) -> Result<()> {
    match end {
        Some(end) if end < start => Err(AppError::Validation(
            "End date cannot be before start date".to_string(),
        )),
        _ => Ok(()),
    }
}

pub fn validate_new_goal(goal: &NewGoal) -> Result<()> {
    validate_title(&goal.title)?;
    validate_description(goal.description.as_deref())?;
    validate_target(goal.target_value)?;
    validate_dates(goal.start_date, goal.end_date)
}

fn validate_update(update: &GoalUpdate, current: Option<&Goal>) -> Result<()> {
    if let Some(title) = &update.title {
        validate_title(title)?;
    }
    validate_description(update.description.as_deref())?;
    if let Some(target) = update.target_value {
        validate_target(target)?;
    }
    match current {
        Some(goal) => validate_dates(goal.start_date, update.end_date),
        None => Ok(()),
    }
}

pub fn validate_progress_value(value: i64) -> Result<()> {
    if value <= 0 {
        return Err(AppError::Validation(
            "Progress value must be positive".to_string(),
        ));
    }
    if value > MAX_PROGRESS_INCREMENT {
        return Err(AppError::Validation(format!(
            "Progress value cannot exceed {}",
            MAX_PROGRESS_INCREMENT
        )));
    }
    Ok(())
}

impl GoalStore {
    pub fn new(user_id: UserId, repository: Arc<dyn GoalRepository>) -> Self {
        Self {
            user_id,
            repository,
            goals: Vec::new(),
            streaks: HashMap::new(),
            daily_streak: Streak::default(),
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn mode(&self) -> PersistenceMode {
        self.repository.mode()
    }

    pub fn goals(&self) -> &[Goal] {
        &self.goals
    }

    /// Replace the collection from the backend.
    ///
    /// A backend failure leaves an empty collection.
    pub async fn load_goals(&mut self) -> &[Goal] {
        self.goals = match self.repository.list_goals(self.user_id).await {
            Ok(goals) => goals,
            Err(e) => {
                tracing::warn!("Failed to load goals for user {}: {}", self.user_id, e);
                Vec::new()
            }
        };
        tracing::info!("Loaded {} goals ({} mode)", self.goals.len(), self.mode());

        if let Err(e) = self.refresh_streaks().await {
            tracing::warn!("Failed to derive streaks: {}", e);
        }

        &self.goals
    }

    pub async fn create_goal(&mut self, goal: NewGoal) -> Result<Goal> {
        validate_new_goal(&goal)?;

        let created = self.repository.insert_goal(self.user_id, goal).await?;
        self.goals.insert(0, created.clone());

        tracing::info!("Created goal {}", created.id);
        Ok(created)
    }

    /// Merge `update` into a goal.
    ///
    /// In fallback mode an unknown or invalid id leaves every goal unchanged
    /// and returns `Ok(None)`; the remote backend reports `GoalNotFound`.
    pub async fn update_goal<I>(&mut self, id: &I, update: GoalUpdate) -> Result<Option<Goal>>
    where
        I: AsRecordId + ?Sized,
    {
        let Some(goal_id) = id.as_record_id() else {
            return self.missing("invalid goal id");
        };
        validate_update(&update, self.find(goal_id))?;

        match self
            .repository
            .update_goal(self.user_id, goal_id, &update)
            .await?
        {
            Some(updated) => {
                self.replace(updated.clone());
                Ok(Some(updated))
            }
            None => self.missing(goal_id),
        }
    }

    /// Log progress dated today
    pub async fn log_progress<I>(
        &mut self,
        id: &I,
        value: i64,
        notes: Option<String>,
    ) -> Result<Option<Goal>>
    where
        I: AsRecordId + ?Sized,
    {
        self.log_progress_on(id, value, notes, Local::now().date_naive())
            .await
    }

    /// Log progress for a given date.
    ///
    /// The entry is stored before the aggregate moves. On
    /// `AppError::PartialWrite` the in-memory goal keeps its old total.
    /// Unknown ids behave as in [`GoalStore::update_goal`].
    pub async fn log_progress_on<I>(
        &mut self,
        id: &I,
        value: i64,
        notes: Option<String>,
        logged_date: NaiveDate,
    ) -> Result<Option<Goal>>
    where
        I: AsRecordId + ?Sized,
    {
        validate_progress_value(value)?;
        let Some(goal_id) = id.as_record_id() else {
            return self.missing("invalid goal id");
        };

        let Some((entry, updated)) = self
            .repository
            .log_progress(self.user_id, goal_id, value, notes, logged_date)
            .await?
        else {
            return self.missing(goal_id);
        };
        self.replace(updated.clone());

        tracing::info!(
            "Logged {} on goal {} as entry {} ({}%)",
            value,
            goal_id,
            entry.id,
            updated.progress_percentage()
        );

        if let Err(e) = self.refresh_streaks().await {
            tracing::warn!("Failed to derive streaks: {}", e);
        }
        Ok(Some(updated))
    }

    pub async fn complete_goal<I>(&mut self, id: &I) -> Result<Option<Goal>>
    where
        I: AsRecordId + ?Sized,
    {
        self.update_goal(id, GoalUpdate::completion(Utc::now())).await
    }

    /// Tolerant lookup; invalid or unknown ids give `None`
    pub fn get_goal_by_id<I>(&self, id: &I) -> Option<&Goal>
    where
        I: AsRecordId + ?Sized,
    {
        id.as_record_id().and_then(|goal_id| self.find(goal_id))
    }

    /// Active goals of one cadence
    pub fn get_goals_by_type(&self, goal_type: GoalType) -> Vec<&Goal> {
        self.goals
            .iter()
            .filter(|g| g.status == GoalStatus::Active && g.goal_type == goal_type)
            .collect()
    }

    pub async fn progress_history(
        &self,
        goal_id: Option<GoalId>,
    ) -> Result<Vec<ProgressLogEntry>> {
        self.repository.list_progress(self.user_id, goal_id).await
    }

    pub async fn refresh_streaks(&mut self) -> Result<()> {
        self.refresh_streaks_at(Local::now().date_naive()).await
    }

    /// Re-derive every streak from the progress log as of `today`
    pub async fn refresh_streaks_at(&mut self, today: NaiveDate) -> Result<()> {
        let entries = self.repository.list_progress(self.user_id, None).await?;

        let mut dates: HashMap<GoalId, Vec<NaiveDate>> = HashMap::new();
        for entry in &entries {
            dates.entry(entry.goal_id).or_default().push(entry.logged_date);
        }

        self.streaks = self
            .goals
            .iter()
            .map(|goal| {
                let goal_dates = dates.get(&goal.id).cloned().unwrap_or_default();
                (goal.id, compute_streak(goal.goal_type, goal_dates, today))
            })
            .collect();

        let daily_dates = self
            .goals
            .iter()
            .filter(|g| g.goal_type == GoalType::Daily)
            .flat_map(|g| dates.get(&g.id).cloned().unwrap_or_default());
        self.daily_streak = compute_streak(GoalType::Daily, daily_dates, today);

        tracing::debug!("Derived streaks for {} goals", self.streaks.len());
        Ok(())
    }

    pub fn streak<I>(&self, id: &I) -> Streak
    where
        I: AsRecordId + ?Sized,
    {
        id.as_record_id()
            .and_then(|goal_id| self.streaks.get(&goal_id).copied())
            .unwrap_or_default()
    }

    /// Sum of every goal's current streak
    pub fn total_streak(&self) -> u32 {
        self.streaks.values().map(|s| s.current).sum()
    }

    /// Consecutive days with an entry on any daily goal
    pub fn daily_streak(&self) -> u32 {
        self.daily_streak.current
    }

    pub fn summary(&self) -> GoalSummary {
        let active: Vec<&Goal> = self.goals.iter().filter(|g| g.is_active()).collect();
        let count_type = |goal_type| active.iter().filter(|g| g.goal_type == goal_type).count();

        let average_progress = if active.is_empty() {
            0
        } else {
            let sum: i64 = active
                .iter()
                .map(|g| g.progress_percentage().min(100))
                .sum();
            (sum as f64 / active.len() as f64).round() as i64
        };

        GoalSummary {
            total: self.goals.len(),
            active: active.len(),
            completed: self
                .goals
                .iter()
                .filter(|g| g.status == GoalStatus::Completed)
                .count(),
            active_daily: count_type(GoalType::Daily),
            active_weekly: count_type(GoalType::Weekly),
            active_yearly: count_type(GoalType::Yearly),
            average_progress,
        }
    }

    /// Outcome for a write against a goal that does not exist
    fn missing(&self, goal: impl Display) -> Result<Option<Goal>> {
        match self.mode() {
            PersistenceMode::Local => {
                tracing::warn!("Goal {} not found in local store; nothing changed", goal);
                Ok(None)
            }
            PersistenceMode::Remote => Err(AppError::GoalNotFound(goal.to_string())),
        }
    }

    fn find(&self, goal_id: GoalId) -> Option<&Goal> {
        self.goals.iter().find(|g| g.id == goal_id)
    }

    fn replace(&mut self, goal: Goal) {
        match self.goals.iter_mut().find(|g| g.id == goal.id) {
            Some(existing) => *existing = goal,
            None => self.goals.insert(0, goal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::local_store::tests::create_test_store;
    use crate::database::RecordId;
    use crate::remote::testing::FakeExecutor;
    use crate::repository::{LocalRepository, RemoteRepository};
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn local_store_for(user: i64) -> GoalStore {
        let repository = Arc::new(LocalRepository::new(create_test_store().await));
        GoalStore::new(RecordId::new(user), repository)
    }

    fn read_goal() -> NewGoal {
        NewGoal::new("Read 30 min", GoalType::Daily, 1, date(2024, 1, 1))
    }

    #[tokio::test]
    async fn test_create_then_lookup() {
        let mut store = local_store_for(1).await;
        store.load_goals().await;

        let goal = store.create_goal(read_goal()).await.unwrap();
        assert_eq!(store.goals()[0].id, goal.id);

        let found = store.get_goal_by_id(&goal.id).unwrap();
        assert_eq!(found.status, GoalStatus::Active);
        assert_eq!(found.total_progress, 0);

        // Same goal through a string id
        assert!(store.get_goal_by_id(goal.id.to_string().as_str()).is_some());
    }

    #[tokio::test]
    async fn test_invalid_ids_return_none() {
        let mut store = local_store_for(1).await;
        store.load_goals().await;

        assert!(store.get_goal_by_id("abc").is_none());
        assert!(store.get_goal_by_id(&None::<i64>).is_none());
        assert!(store.get_goal_by_id(&json!(null)).is_none());
        assert!(store.get_goal_by_id(&999_999_i64).is_none());
    }

    #[tokio::test]
    async fn test_log_progress_completes_single_target() {
        let mut store = local_store_for(1).await;
        store.load_goals().await;
        let goal = store.create_goal(read_goal()).await.unwrap();

        let updated = store.log_progress(&goal.id, 1, None).await.unwrap().unwrap();
        assert_eq!(updated.total_progress, 1);
        assert_eq!(updated.progress_percentage(), 100);
        assert!(updated.is_progress_complete());
    }

    #[tokio::test]
    async fn test_validation_rejects_bad_input() {
        let mut store = local_store_for(1).await;
        store.load_goals().await;

        let mut empty_title = read_goal();
        empty_title.title = "   ".to_string();
        assert!(matches!(
            store.create_goal(empty_title).await,
            Err(AppError::Validation(_))
        ));

        let mut zero_target = read_goal();
        zero_target.target_value = 0;
        assert!(store.create_goal(zero_target).await.is_err());

        let mut backwards = read_goal();
        backwards.end_date = Some(date(2023, 12, 31));
        assert!(store.create_goal(backwards).await.is_err());

        let goal = store.create_goal(read_goal()).await.unwrap();
        assert!(store.log_progress(&goal.id, 0, None).await.is_err());
        assert!(store.log_progress(&goal.id, -2, None).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_goal_is_a_no_op_locally() {
        let mut store = local_store_for(1).await;
        store.load_goals().await;
        let before = store.goals().to_vec();

        let logged = store.log_progress(&RecordId::new(424_242), 1, None).await;
        assert!(matches!(logged, Ok(None)));

        let completed = store.complete_goal("not-an-id").await;
        assert!(matches!(completed, Ok(None)));

        let update = GoalUpdate {
            title: Some("Renamed".to_string()),
            ..GoalUpdate::default()
        };
        assert!(matches!(store.update_goal(&json!(null), update.clone()).await, Ok(None)));
        assert!(matches!(store.update_goal(&999_999_i64, update).await, Ok(None)));

        assert_eq!(store.goals(), before.as_slice());
        assert!(store.progress_history(None).await.unwrap().is_empty());

        // A fresh load sees the same collection
        store.load_goals().await;
        assert_eq!(store.goals().len(), before.len());
    }

    #[tokio::test]
    async fn test_unknown_goal_is_not_found_remotely() {
        let repository = Arc::new(RemoteRepository::new(Arc::new(FakeExecutor::empty()), "gt"));
        let mut store = GoalStore::new(RecordId::new(1), repository);
        store.load_goals().await;

        let logged = store.log_progress(&RecordId::new(5), 1, None).await;
        assert!(matches!(logged, Err(AppError::GoalNotFound(_))));
        let completed = store.complete_goal("not-an-id").await;
        assert!(matches!(completed, Err(AppError::GoalNotFound(_))));
    }

    #[tokio::test]
    async fn test_complete_goal_removes_it_from_type_view() {
        let mut store = local_store_for(1).await;
        store.load_goals().await;
        let seeded_daily = store.get_goals_by_type(GoalType::Daily).len();

        let goal = store.create_goal(read_goal()).await.unwrap();
        assert_eq!(store.get_goals_by_type(GoalType::Daily).len(), seeded_daily + 1);

        let completed = store.complete_goal(&goal.id).await.unwrap().unwrap();
        assert_eq!(completed.status, GoalStatus::Completed);
        assert!(completed.completed_at.is_some());
        assert_eq!(store.get_goals_by_type(GoalType::Daily).len(), seeded_daily);
    }

    #[tokio::test]
    async fn test_streaks_derive_from_log() {
        let mut store = local_store_for(1).await;
        store.load_goals().await;
        let goal = store.create_goal(read_goal()).await.unwrap();

        for day in [8, 9, 10] {
            store
                .log_progress_on(&goal.id, 1, None, date(2024, 3, day))
                .await
                .unwrap();
        }
        store.refresh_streaks_at(date(2024, 3, 11)).await.unwrap();

        assert_eq!(store.streak(&goal.id).current, 3);
        assert_eq!(store.streak(&goal.id).last_entry, Some(date(2024, 3, 10)));
        assert_eq!(store.daily_streak(), 3);
        assert_eq!(store.total_streak(), 3);
    }

    #[tokio::test]
    async fn test_summary_counts() {
        let mut store = local_store_for(1).await;
        store.load_goals().await;

        // Seeds: daily 15/1 and weekly 8/3, both over target
        let summary = store.summary();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.active, 2);
        assert_eq!(summary.active_daily, 1);
        assert_eq!(summary.active_weekly, 1);
        assert_eq!(summary.average_progress, 100);
    }

    #[tokio::test]
    async fn test_remote_load_failure_gives_empty_collection() {
        let repository = Arc::new(RemoteRepository::new(
            Arc::new(FakeExecutor::failing()),
            "gt",
        ));
        let mut store = GoalStore::new(RecordId::new(1), repository);

        assert!(store.load_goals().await.is_empty());
        assert_eq!(store.mode(), PersistenceMode::Remote);
        assert!(store.create_goal(read_goal()).await.is_err());
        assert!(store.goals().is_empty());
    }

    #[tokio::test]
    async fn test_partial_write_keeps_stale_aggregate() {
        let executor = FakeExecutor::new(|sql, _| {
            if sql.starts_with("SELECT * FROM gt.goals WHERE user_id") {
                Ok(vec![json!({
                    "id": 3, "user_id": 1, "title": "Run", "goal_type": "daily",
                    "target_value": 5, "total_progress": 2, "start_date": "2024-01-01"
                })])
            } else if sql.contains("INSERT INTO gt.progress_logs") {
                Ok(vec![json!({
                    "id": 50, "goal_id": 3, "value": 1, "logged_date": "2024-03-01"
                })])
            } else if sql.contains("SELECT pl.*") {
                Ok(Vec::new())
            } else {
                Err(AppError::Remote("HTTP 500".to_string()))
            }
        });
        let repository = Arc::new(RemoteRepository::new(Arc::new(executor), "gt"));
        let mut store = GoalStore::new(RecordId::new(1), repository);
        store.load_goals().await;

        let result = store.log_progress(&RecordId::new(3), 1, None).await;
        assert!(matches!(result, Err(AppError::PartialWrite(_))));
        assert_eq!(store.get_goal_by_id(&3_i64).unwrap().total_progress, 2);
    }
}
