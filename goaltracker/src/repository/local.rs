//! Local repository
//!
//! Fallback-mode persistence over the namespaced key-value store. Each
//! collection lives under one key (`goalTracker_goals_<userId>`,
//! `goalTracker_microGoals_<goalId>`, ...) and is rewritten whole on every
//! change. Ids are creation timestamps in milliseconds, bumped past the
//! largest id already in the collection.

use super::{
    GoalRepository, MicroGoalRepository, PartnerRepository, PersistenceMode,
    ReflectionRepository, UserRepository,
};
use crate::config::{
    ENTITY_ACCOUNT, ENTITY_GOALS, ENTITY_MICRO_GOALS, ENTITY_PARTNERS, ENTITY_PROGRESS,
    ENTITY_REFLECTIONS,
};
use crate::database::{
    AccountabilityPartner, Goal, GoalId, GoalType, GoalUpdate, LocalStore, MicroGoal,
    MicroGoalUpdate, NewGoal, NewMicroGoal, NewPartner, PartnerStatus, ProgressLogEntry, RecordId,
    Reflection, StoredAccount, User, UserId, UserUpdate,
};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

/// Repository over the local fallback store
#[derive(Clone)]
pub struct LocalRepository {
    store: LocalStore,
}

impl LocalRepository {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    fn account_key(&self, email: &str) -> String {
        self.store
            .key(ENTITY_ACCOUNT, email.trim().to_lowercase())
    }

    async fn read_goals(&self, user_id: UserId) -> Vec<Goal> {
        self.store
            .read_or_default(&self.store.key(ENTITY_GOALS, user_id))
            .await
    }

    async fn write_goals(&self, user_id: UserId, goals: &[Goal]) {
        self.store
            .write(&self.store.key(ENTITY_GOALS, user_id), goals)
            .await;
    }

    async fn read_micro_goals(&self, goal_id: GoalId) -> Vec<MicroGoal> {
        self.store
            .read_or_default(&self.store.key(ENTITY_MICRO_GOALS, goal_id))
            .await
    }

    async fn write_micro_goals(&self, goal_id: GoalId, micro_goals: &[MicroGoal]) {
        self.store
            .write(&self.store.key(ENTITY_MICRO_GOALS, goal_id), micro_goals)
            .await;
    }
}

/// Fresh id: the current time in millis, or one past the largest existing id
pub(crate) fn next_local_id<I>(existing: I, now: DateTime<Utc>) -> RecordId
where
    I: IntoIterator<Item = RecordId>,
{
    let floor = existing
        .into_iter()
        .map(RecordId::get)
        .max()
        .map_or(1, |max| max + 1);
    RecordId::new(now.timestamp_millis().max(floor))
}

/// Example goals written once for a user with no local collection
pub(crate) fn seed_goals(user_id: UserId, now: DateTime<Utc>) -> Vec<Goal> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN);

    let mut reading = NewGoal::new("Read for 30 minutes daily", GoalType::Daily, 1, start)
        .with_description("Build a consistent reading habit to expand knowledge")
        .into_goal(RecordId::new(1), user_id, now);
    reading.total_progress = 15;

    let mut exercise = NewGoal::new("Exercise 3 times per week", GoalType::Weekly, 3, start)
        .with_description("Maintain physical fitness and health")
        .into_goal(RecordId::new(2), user_id, now);
    exercise.total_progress = 8;

    vec![reading, exercise]
}

#[async_trait]
impl UserRepository for LocalRepository {
    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<User> {
        let key = self.account_key(email);
        if self.store.exists(&key).await {
            return Err(AppError::Validation(format!(
                "An account already exists for {}",
                email
            )));
        }

        let account = StoredAccount {
            user: User {
                id: RecordId::from_timestamp(Utc::now()),
                email: email.trim().to_string(),
                name: name.to_string(),
                onboarding_completed: false,
            },
            password_hash: password_hash.to_string(),
        };
        self.store.write(&key, &account).await;

        tracing::debug!("Created local account: {}", account.user.id);
        Ok(account.user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<StoredAccount>> {
        Ok(self.store.read(&self.account_key(email)).await)
    }

    async fn update_user(&self, user: &User, update: &UserUpdate) -> Result<User> {
        let mut merged = user.clone();
        update.apply_to(&mut merged);

        let key = self.account_key(&user.email);
        if let Some(mut account) = self.store.read::<StoredAccount>(&key).await {
            if account.user.id == user.id {
                account.user = merged.clone();
                self.store.write(&key, &account).await;
            }
        }

        Ok(merged)
    }
}

#[async_trait]
impl GoalRepository for LocalRepository {
    fn mode(&self) -> PersistenceMode {
        PersistenceMode::Local
    }

    async fn list_goals(&self, user_id: UserId) -> Result<Vec<Goal>> {
        let key = self.store.key(ENTITY_GOALS, user_id);

        if !self.store.exists(&key).await {
            let seeded = seed_goals(user_id, Utc::now());
            self.store.write(&key, &seeded).await;
            tracing::info!("Seeded example goals for local user {}", user_id);
            return Ok(seeded);
        }

        let mut goals = self.read_goals(user_id).await;
        goals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(goals)
    }

    async fn insert_goal(&self, user_id: UserId, goal: NewGoal) -> Result<Goal> {
        let mut goals = self.read_goals(user_id).await;
        let now = Utc::now();

        let id = next_local_id(goals.iter().map(|g| g.id), now);
        let created = goal.into_goal(id, user_id, now);
        goals.insert(0, created.clone());
        self.write_goals(user_id, &goals).await;

        tracing::debug!("Created local goal: {}", id);
        Ok(created)
    }

    async fn update_goal(
        &self,
        user_id: UserId,
        goal_id: GoalId,
        update: &GoalUpdate,
    ) -> Result<Option<Goal>> {
        let mut goals = self.read_goals(user_id).await;
        let Some(goal) = goals.iter_mut().find(|g| g.id == goal_id) else {
            return Ok(None);
        };

        update.apply_to(goal);
        let updated = goal.clone();
        self.write_goals(user_id, &goals).await;

        tracing::debug!("Updated local goal: {}", goal_id);
        Ok(Some(updated))
    }

    async fn log_progress(
        &self,
        user_id: UserId,
        goal_id: GoalId,
        value: i64,
        notes: Option<String>,
        logged_date: NaiveDate,
    ) -> Result<Option<(ProgressLogEntry, Goal)>> {
        let mut goals = self.read_goals(user_id).await;
        let Some(index) = goals.iter().position(|g| g.id == goal_id) else {
            return Ok(None);
        };

        let now = Utc::now();
        let progress_key = self.store.key(ENTITY_PROGRESS, user_id);
        let mut entries: Vec<ProgressLogEntry> = self.store.read_or_default(&progress_key).await;

        let entry = ProgressLogEntry {
            id: next_local_id(entries.iter().map(|e| e.id), now),
            goal_id,
            value,
            notes,
            logged_date,
            created_at: now,
        };
        entries.push(entry.clone());
        self.store.write(&progress_key, &entries).await;

        let goal = &mut goals[index];
        goal.total_progress += value;
        goal.last_progress_date = Some(logged_date);
        let updated = goal.clone();
        self.write_goals(user_id, &goals).await;

        tracing::debug!("Logged {} progress on local goal {}", value, goal_id);
        Ok(Some((entry, updated)))
    }

    async fn list_progress(
        &self,
        user_id: UserId,
        goal_id: Option<GoalId>,
    ) -> Result<Vec<ProgressLogEntry>> {
        let entries: Vec<ProgressLogEntry> = self
            .store
            .read_or_default(&self.store.key(ENTITY_PROGRESS, user_id))
            .await;

        let mut entries: Vec<ProgressLogEntry> = entries
            .into_iter()
            .filter(|e| goal_id.map_or(true, |id| e.goal_id == id))
            .collect();
        entries.sort_by(|a, b| {
            b.logged_date
                .cmp(&a.logged_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(entries)
    }
}

#[async_trait]
impl MicroGoalRepository for LocalRepository {
    async fn list_micro_goals(&self, goal_id: GoalId) -> Result<Vec<MicroGoal>> {
        let mut micro_goals = self.read_micro_goals(goal_id).await;
        micro_goals.sort_by(|a, b| {
            a.order_index
                .cmp(&b.order_index)
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(micro_goals)
    }

    async fn insert_micro_goal(
        &self,
        goal_id: GoalId,
        micro_goal: NewMicroGoal,
    ) -> Result<MicroGoal> {
        let mut micro_goals = self.read_micro_goals(goal_id).await;
        let now = Utc::now();

        let created = MicroGoal {
            id: next_local_id(micro_goals.iter().map(|m| m.id), now),
            parent_goal_id: goal_id,
            title: micro_goal.title,
            description: micro_goal.description,
            target_date: micro_goal.target_date,
            completed: false,
            order_index: micro_goal
                .order_index
                .unwrap_or(micro_goals.len() as i64),
            created_at: now,
            completed_at: None,
        };
        micro_goals.push(created.clone());
        self.write_micro_goals(goal_id, &micro_goals).await;

        Ok(created)
    }

    async fn update_micro_goal(
        &self,
        goal_id: GoalId,
        micro_goal_id: RecordId,
        update: &MicroGoalUpdate,
    ) -> Result<MicroGoal> {
        let mut micro_goals = self.read_micro_goals(goal_id).await;
        let micro_goal = micro_goals
            .iter_mut()
            .find(|m| m.id == micro_goal_id)
            .ok_or_else(|| AppError::MicroGoalNotFound(micro_goal_id.to_string()))?;

        update.apply_to(micro_goal);
        let updated = micro_goal.clone();
        self.write_micro_goals(goal_id, &micro_goals).await;

        Ok(updated)
    }

    async fn delete_micro_goal(&self, goal_id: GoalId, micro_goal_id: RecordId) -> Result<()> {
        let mut micro_goals = self.read_micro_goals(goal_id).await;
        let before = micro_goals.len();
        micro_goals.retain(|m| m.id != micro_goal_id);

        if micro_goals.len() == before {
            return Err(AppError::MicroGoalNotFound(micro_goal_id.to_string()));
        }

        self.write_micro_goals(goal_id, &micro_goals).await;
        tracing::debug!("Deleted local micro goal: {}", micro_goal_id);
        Ok(())
    }
}

#[async_trait]
impl PartnerRepository for LocalRepository {
    async fn list_partners(&self, user_id: UserId) -> Result<Vec<AccountabilityPartner>> {
        let partners: Vec<AccountabilityPartner> = self
            .store
            .read_or_default(&self.store.key(ENTITY_PARTNERS, user_id))
            .await;

        let mut active: Vec<AccountabilityPartner> = partners
            .into_iter()
            .filter(|p| p.status == PartnerStatus::Active)
            .collect();
        active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(active)
    }

    async fn insert_partner(
        &self,
        user_id: UserId,
        partner: NewPartner,
    ) -> Result<AccountabilityPartner> {
        let key = self.store.key(ENTITY_PARTNERS, user_id);
        let mut partners: Vec<AccountabilityPartner> = self.store.read_or_default(&key).await;
        let now = Utc::now();

        let created = AccountabilityPartner {
            id: next_local_id(partners.iter().map(|p| p.id), now),
            user_id: Some(user_id),
            partner_name: partner.partner_name,
            partner_email: partner.partner_email,
            shared_goals: partner.shared_goals,
            privacy_settings: partner.privacy_settings,
            status: PartnerStatus::Active,
            created_at: now,
        };
        partners.push(created.clone());
        self.store.write(&key, &partners).await;

        Ok(created)
    }
}

#[async_trait]
impl ReflectionRepository for LocalRepository {
    async fn list_reflections(&self, user_id: UserId, limit: i64) -> Result<Vec<Reflection>> {
        let mut reflections: Vec<Reflection> = self
            .store
            .read_or_default(&self.store.key(ENTITY_REFLECTIONS, user_id))
            .await;

        reflections.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        reflections.truncate(limit.max(0) as usize);
        Ok(reflections)
    }

    async fn insert_reflection(
        &self,
        user_id: UserId,
        prompt: &str,
        response: &str,
    ) -> Result<Reflection> {
        let key = self.store.key(ENTITY_REFLECTIONS, user_id);
        let mut reflections: Vec<Reflection> = self.store.read_or_default(&key).await;
        let now = Utc::now();

        let created = Reflection {
            id: next_local_id(reflections.iter().map(|r| r.id), now),
            user_id: Some(user_id),
            prompt: prompt.to_string(),
            response: response.to_string(),
            created_at: now,
        };
        reflections.push(created.clone());
        self.store.write(&key, &reflections).await;

        Ok(created)
    }
}

/// Goal with no metadata and the default status, for tests across modules
#[cfg(test)]
pub(crate) fn sample_goal(id: i64, goal_type: GoalType) -> Goal {
    Goal {
        id: RecordId::new(id),
        user_id: None,
        title: format!("Goal {}", id),
        description: None,
        goal_type,
        target_value: 1,
        total_progress: 0,
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        end_date: None,
        status: crate::database::GoalStatus::Active,
        habit_stack_trigger: None,
        reminder_time: None,
        metadata: serde_json::Map::new(),
        created_at: Utc::now(),
        completed_at: None,
        last_progress_date: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::local_store::tests::create_test_store;
    use crate::database::GoalStatus;
    use chrono::TimeZone;

    async fn create_test_repository() -> LocalRepository {
        LocalRepository::new(create_test_store().await)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_next_id_never_collides() {
        let now = Utc.timestamp_millis_opt(1_000).unwrap();

        assert_eq!(next_local_id(Vec::new(), now), RecordId::new(1_000));
        assert_eq!(
            next_local_id(vec![RecordId::new(5_000)], now),
            RecordId::new(5_001)
        );
    }

    #[tokio::test]
    async fn test_new_user_gets_seed_goals_once() {
        let repo = create_test_repository().await;
        let user = RecordId::new(42);

        let goals = repo.list_goals(user).await.unwrap();
        assert_eq!(goals.len(), 2);
        assert_eq!(goals[0].title, "Read for 30 minutes daily");
        assert_eq!(goals[1].total_progress, 8);
        assert!(repo.store().exists("goalTracker_goals_42").await);

        // An emptied collection is not reseeded
        repo.write_goals(user, &[]).await;
        assert!(repo.list_goals(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_collection_reads_empty() {
        let repo = create_test_repository().await;
        let key = repo.store().key(ENTITY_GOALS, 9);
        repo.store().write(&key, "not a list").await;

        assert!(repo.list_goals(RecordId::new(9)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_then_update_goal() {
        let repo = create_test_repository().await;
        let user = RecordId::new(1);
        repo.write_goals(user, &[]).await;

        let goal = repo
            .insert_goal(user, NewGoal::new("Walk", GoalType::Daily, 2, date(2024, 5, 1)))
            .await
            .unwrap();
        assert_eq!(goal.status, GoalStatus::Active);
        assert_eq!(goal.total_progress, 0);

        let updated = repo
            .update_goal(user, goal.id, &GoalUpdate::completion(Utc::now()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, GoalStatus::Completed);
        assert!(updated.completed_at.is_some());

        // Unknown ids leave the collection as it was
        let missing = repo
            .update_goal(user, RecordId::new(77), &GoalUpdate::completion(Utc::now()))
            .await
            .unwrap();
        assert!(missing.is_none());
        let goals = repo.list_goals(user).await.unwrap();
        assert_eq!(goals.len(), 1);
        assert_eq!(goals[0].id, goal.id);
    }

    #[tokio::test]
    async fn test_log_progress_appends_and_accumulates() {
        let repo = create_test_repository().await;
        let user = RecordId::new(1);
        repo.write_goals(user, &[]).await;
        let goal = repo
            .insert_goal(user, NewGoal::new("Walk", GoalType::Daily, 2, date(2024, 5, 1)))
            .await
            .unwrap();

        repo.log_progress(user, goal.id, 1, None, date(2024, 5, 2))
            .await
            .unwrap();
        let (entry, updated) = repo
            .log_progress(user, goal.id, 2, Some("long walk".into()), date(2024, 5, 3))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(entry.notes.as_deref(), Some("long walk"));
        assert_eq!(updated.total_progress, 3);
        assert_eq!(updated.last_progress_date, Some(date(2024, 5, 3)));

        let entries = repo.list_progress(user, Some(goal.id)).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].logged_date, date(2024, 5, 3));

        let reloaded = repo.list_goals(user).await.unwrap();
        assert_eq!(reloaded[0].total_progress, 3);
    }

    #[tokio::test]
    async fn test_log_progress_unknown_goal_writes_nothing() {
        let repo = create_test_repository().await;
        let user = RecordId::new(1);
        repo.write_goals(user, &[]).await;

        let result = repo
            .log_progress(user, RecordId::new(5), 1, None, date(2024, 5, 2))
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(repo.list_goals(user).await.unwrap().is_empty());
        assert!(repo.list_progress(user, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_micro_goal_ordering_and_delete() {
        let repo = create_test_repository().await;
        let goal = RecordId::new(3);

        for (title, order) in [("Second", 1), ("First", 0)] {
            repo.insert_micro_goal(
                goal,
                NewMicroGoal {
                    title: title.to_string(),
                    description: None,
                    target_date: None,
                    order_index: Some(order),
                },
            )
            .await
            .unwrap();
        }

        let listed = repo.list_micro_goals(goal).await.unwrap();
        assert_eq!(listed[0].title, "First");
        assert_eq!(listed[1].title, "Second");

        let toggled = repo
            .update_micro_goal(goal, listed[0].id, &MicroGoalUpdate::completion(true, Utc::now()))
            .await
            .unwrap();
        assert!(toggled.completed);
        assert!(toggled.completed_at.is_some());

        repo.delete_micro_goal(goal, listed[0].id).await.unwrap();
        assert_eq!(repo.list_micro_goals(goal).await.unwrap().len(), 1);
        assert!(repo.delete_micro_goal(goal, listed[0].id).await.is_err());
    }

    #[tokio::test]
    async fn test_accounts_are_keyed_by_email() {
        let repo = create_test_repository().await;

        let user = repo
            .create_user("Ada", "Ada@Example.com", "hash")
            .await
            .unwrap();
        let found = repo.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert_eq!(found.user.id, user.id);
        assert_eq!(found.password_hash, "hash");

        let duplicate = repo.create_user("Ada", "ada@example.com", "other").await;
        assert!(matches!(duplicate, Err(AppError::Validation(_))));

        let update = UserUpdate {
            onboarding_completed: Some(true),
            ..UserUpdate::default()
        };
        let merged = repo.update_user(&user, &update).await.unwrap();
        assert!(merged.onboarding_completed);
        let stored = repo.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert!(stored.user.onboarding_completed);
    }

    #[tokio::test]
    async fn test_reflections_most_recent_first_with_limit() {
        let repo = create_test_repository().await;
        let user = RecordId::new(1);

        for prompt in ["one", "two", "three"] {
            repo.insert_reflection(user, prompt, "answer").await.unwrap();
        }

        let listed = repo.list_reflections(user, 2).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].created_at >= listed[1].created_at);
    }
}
