//! Remote repository
//!
//! Every entity query goes through the persistence adapter as parameterized
//! SQL against the configured schema. Ownership is enforced by scoping each
//! statement to the owning user (or parent goal for micro goals).

use super::{
    GoalRepository, MicroGoalRepository, PartnerRepository, PersistenceMode,
    ReflectionRepository, UserRepository,
};
use crate::database::{
    AccountabilityPartner, Goal, GoalId, GoalUpdate, MicroGoal, MicroGoalUpdate, NewGoal,
    NewMicroGoal, NewPartner, ProgressLogEntry, RecordId, Reflection, StoredAccount, User, UserId,
    UserUpdate,
};
use crate::error::{AppError, Result};
use crate::remote::QueryExecutor;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

/// Repository over the remote Postgres-over-HTTP backend
#[derive(Clone)]
pub struct RemoteRepository {
    executor: Arc<dyn QueryExecutor>,
    schema: String,
}

impl RemoteRepository {
    /// `schema` must already be validated (see `remote::schema`)
    pub fn new(executor: Arc<dyn QueryExecutor>, schema: &str) -> Self {
        Self {
            executor,
            schema: schema.to_string(),
        }
    }

    fn table(&self, name: &str) -> String {
        format!("{}.{}", self.schema, name)
    }

    async fn query<T: DeserializeOwned>(&self, sql: &str, params: Vec<Value>) -> Result<Vec<T>> {
        let rows = self.executor.execute(sql, params).await?;
        rows.into_iter().map(decode_row).collect()
    }

    async fn query_one<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: Vec<Value>,
    ) -> Result<Option<T>> {
        Ok(self.query(sql, params).await?.into_iter().next())
    }

    async fn fetch_goal(&self, user_id: UserId, goal_id: GoalId) -> Result<Option<Goal>> {
        let sql = format!(
            "SELECT * FROM {} WHERE id = $1 AND user_id = $2",
            self.table("goals")
        );
        self.query_one(&sql, vec![id_param(goal_id), id_param(user_id)])
            .await
    }

    async fn fetch_micro_goal(
        &self,
        goal_id: GoalId,
        micro_goal_id: RecordId,
    ) -> Result<MicroGoal> {
        let sql = format!(
            "SELECT * FROM {} WHERE id = $1 AND parent_goal_id = $2",
            self.table("micro_goals")
        );
        self.query_one(&sql, vec![id_param(micro_goal_id), id_param(goal_id)])
            .await?
            .ok_or_else(|| AppError::MicroGoalNotFound(micro_goal_id.to_string()))
    }
}

fn decode_row<T: DeserializeOwned>(row: Value) -> Result<T> {
    serde_json::from_value(row).map_err(|e| {
        tracing::warn!("Malformed remote row: {}", e);
        AppError::Remote(format!("Malformed row: {}", e))
    })
}

fn id_param(id: RecordId) -> Value {
    json!(id.get())
}

fn date_param(date: Option<NaiveDate>) -> Value {
    date.map(|d| json!(d.format("%Y-%m-%d").to_string()))
        .unwrap_or(Value::Null)
}

fn time_param(time: Option<NaiveTime>) -> Value {
    time.map(|t| json!(t.format("%H:%M:%S").to_string()))
        .unwrap_or(Value::Null)
}

fn timestamp_param(timestamp: Option<DateTime<Utc>>) -> Value {
    timestamp
        .map(|t| json!(t.to_rfc3339()))
        .unwrap_or(Value::Null)
}

/// SET clause accumulator; column names only ever come from string literals
#[derive(Default)]
struct Assignments {
    columns: Vec<String>,
    params: Vec<Value>,
}

impl Assignments {
    fn set(&mut self, column: &'static str, value: Value) {
        self.params.push(value);
        self.columns.push(format!("{} = ${}", column, self.params.len()));
    }

    fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Next positional placeholder after the assignments
    fn next_placeholder(&self) -> usize {
        self.params.len() + 1
    }
}

fn goal_assignments(update: &GoalUpdate) -> Result<Assignments> {
    let mut set = Assignments::default();

    if let Some(title) = &update.title {
        set.set("title", json!(title));
    }
    if let Some(description) = &update.description {
        set.set("description", json!(description));
    }
    if let Some(goal_type) = update.goal_type {
        set.set("goal_type", json!(goal_type.as_str()));
    }
    if let Some(target) = update.target_value {
        set.set("target_value", json!(target));
    }
    if update.end_date.is_some() {
        set.set("end_date", date_param(update.end_date));
    }
    if let Some(status) = update.status {
        set.set("status", json!(status.as_str()));
    }
    if let Some(trigger) = &update.habit_stack_trigger {
        set.set("habit_stack_trigger", json!(trigger));
    }
    if update.reminder_time.is_some() {
        set.set("reminder_time", time_param(update.reminder_time));
    }
    if let Some(metadata) = &update.metadata {
        set.set("metadata", json!(serde_json::to_string(metadata)?));
    }
    if update.completed_at.is_some() {
        set.set("completed_at", timestamp_param(update.completed_at));
    }

    Ok(set)
}

fn micro_goal_assignments(update: &MicroGoalUpdate) -> Assignments {
    let mut set = Assignments::default();

    if let Some(title) = &update.title {
        set.set("title", json!(title));
    }
    if let Some(description) = &update.description {
        set.set("description", json!(description));
    }
    if update.target_date.is_some() {
        set.set("target_date", date_param(update.target_date));
    }
    if let Some(completed) = update.completed {
        set.set("completed", json!(completed));
    }
    if let Some(completed_at) = update.completed_at {
        set.set("completed_at", timestamp_param(completed_at));
    }

    set
}

#[async_trait]
impl UserRepository for RemoteRepository {
    async fn create_user(&self, name: &str, email: &str, password_hash: &str) -> Result<User> {
        let sql = format!(
            r#"INSERT INTO {} (email, name, password_hash)
               VALUES ($1, $2, $3)
               RETURNING id, email, name, onboarding_completed, created_at"#,
            self.table("users")
        );

        let user: User = self
            .query_one(&sql, vec![json!(email), json!(name), json!(password_hash)])
            .await?
            .ok_or_else(|| AppError::Remote("User insert returned no row".to_string()))?;

        tracing::debug!("Created remote user: {}", user.id);
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<StoredAccount>> {
        let sql = format!(
            r#"SELECT id, email, name, password_hash, onboarding_completed, created_at
               FROM {} WHERE email = $1"#,
            self.table("users")
        );
        self.query_one(&sql, vec![json!(email)]).await
    }

    async fn update_user(&self, user: &User, update: &UserUpdate) -> Result<User> {
        let mut set = Assignments::default();
        if let Some(name) = &update.name {
            set.set("name", json!(name));
        }
        if let Some(done) = update.onboarding_completed {
            set.set("onboarding_completed", json!(done));
        }

        if set.is_empty() {
            return Ok(user.clone());
        }

        let id_placeholder = set.next_placeholder();
        let sql = format!(
            r#"UPDATE {} SET {}, updated_at = CURRENT_TIMESTAMP
               WHERE id = ${}
               RETURNING id, email, name, onboarding_completed"#,
            self.table("users"),
            set.columns.join(", "),
            id_placeholder
        );
        let mut params = set.params;
        params.push(id_param(user.id));

        self.query_one(&sql, params)
            .await?
            .ok_or(AppError::NotAuthenticated)
    }
}

#[async_trait]
impl GoalRepository for RemoteRepository {
    fn mode(&self) -> PersistenceMode {
        PersistenceMode::Remote
    }

    async fn list_goals(&self, user_id: UserId) -> Result<Vec<Goal>> {
        let sql = format!(
            "SELECT * FROM {} WHERE user_id = $1 ORDER BY created_at DESC",
            self.table("goals")
        );
        self.query(&sql, vec![id_param(user_id)]).await
    }

    async fn insert_goal(&self, user_id: UserId, goal: NewGoal) -> Result<Goal> {
        let sql = format!(
            r#"INSERT INTO {} (user_id, title, description, goal_type, target_value, start_date,
                               end_date, habit_stack_trigger, reminder_time, metadata)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               RETURNING *"#,
            self.table("goals")
        );

        let params = vec![
            id_param(user_id),
            json!(goal.title),
            json!(goal.description),
            json!(goal.goal_type.as_str()),
            json!(goal.target_value),
            date_param(Some(goal.start_date)),
            date_param(goal.end_date),
            json!(goal.habit_stack_trigger),
            time_param(goal.reminder_time),
            json!(serde_json::to_string(&goal.metadata)?),
        ];

        let created: Goal = self
            .query_one(&sql, params)
            .await?
            .ok_or_else(|| AppError::Remote("Goal insert returned no row".to_string()))?;

        tracing::debug!("Created remote goal: {}", created.id);
        Ok(created)
    }

    async fn update_goal(
        &self,
        user_id: UserId,
        goal_id: GoalId,
        update: &GoalUpdate,
    ) -> Result<Option<Goal>> {
        let set = goal_assignments(update)?;
        if set.is_empty() {
            return self.fetch_goal(user_id, goal_id).await;
        }

        let id_placeholder = set.next_placeholder();
        let sql = format!(
            r#"UPDATE {} SET {}, updated_at = CURRENT_TIMESTAMP
               WHERE id = ${} AND user_id = ${}
               RETURNING *"#,
            self.table("goals"),
            set.columns.join(", "),
            id_placeholder,
            id_placeholder + 1
        );
        let mut params = set.params;
        params.push(id_param(goal_id));
        params.push(id_param(user_id));

        let updated: Option<Goal> = self.query_one(&sql, params).await?;
        if updated.is_some() {
            tracing::debug!("Updated remote goal: {}", goal_id);
        }
        Ok(updated)
    }

    async fn log_progress(
        &self,
        user_id: UserId,
        goal_id: GoalId,
        value: i64,
        notes: Option<String>,
        logged_date: NaiveDate,
    ) -> Result<Option<(ProgressLogEntry, Goal)>> {
        // The log row goes in first and only for a goal the user owns
        let insert = format!(
            r#"INSERT INTO {} (goal_id, value, notes, logged_date)
               SELECT $1::integer, $2::integer, $3::text, $4::date
               WHERE EXISTS (SELECT 1 FROM {} WHERE id = $1 AND user_id = $5)
               RETURNING *"#,
            self.table("progress_logs"),
            self.table("goals")
        );

        let entry: Option<ProgressLogEntry> = self
            .query_one(
                &insert,
                vec![
                    id_param(goal_id),
                    json!(value),
                    json!(notes),
                    date_param(Some(logged_date)),
                    id_param(user_id),
                ],
            )
            .await?;
        let Some(entry) = entry else {
            return Ok(None);
        };

        let update = format!(
            r#"UPDATE {} SET total_progress = COALESCE(total_progress, 0) + $1,
                             updated_at = CURRENT_TIMESTAMP
               WHERE id = $2 AND user_id = $3
               RETURNING *"#,
            self.table("goals")
        );

        let goal = match self
            .query_one::<Goal>(&update, vec![json!(value), id_param(goal_id), id_param(user_id)])
            .await
        {
            Ok(Some(goal)) => goal,
            Ok(None) => {
                return Err(AppError::PartialWrite(format!(
                    "progress entry {} stored but goal {} was not updated",
                    entry.id, goal_id
                )))
            }
            Err(e) => {
                tracing::error!(
                    "Progress entry {} stored but aggregate update failed: {}",
                    entry.id,
                    e
                );
                return Err(AppError::PartialWrite(format!(
                    "progress entry {} stored but aggregate update failed: {}",
                    entry.id, e
                )));
            }
        };

        tracing::debug!("Logged {} progress on remote goal {}", value, goal_id);
        Ok(Some((entry, goal)))
    }

    async fn list_progress(
        &self,
        user_id: UserId,
        goal_id: Option<GoalId>,
    ) -> Result<Vec<ProgressLogEntry>> {
        let mut sql = format!(
            r#"SELECT pl.* FROM {} pl
               JOIN {} g ON g.id = pl.goal_id
               WHERE g.user_id = $1"#,
            self.table("progress_logs"),
            self.table("goals")
        );
        let mut params = vec![id_param(user_id)];

        if let Some(goal_id) = goal_id {
            sql.push_str(" AND pl.goal_id = $2");
            params.push(id_param(goal_id));
        }
        sql.push_str(" ORDER BY pl.logged_date DESC, pl.created_at DESC");

        self.query(&sql, params).await
    }
}

#[async_trait]
impl MicroGoalRepository for RemoteRepository {
    async fn list_micro_goals(&self, goal_id: GoalId) -> Result<Vec<MicroGoal>> {
        let sql = format!(
            r#"SELECT * FROM {} WHERE parent_goal_id = $1
               ORDER BY order_index ASC, created_at ASC"#,
            self.table("micro_goals")
        );
        self.query(&sql, vec![id_param(goal_id)]).await
    }

    async fn insert_micro_goal(
        &self,
        goal_id: GoalId,
        micro_goal: NewMicroGoal,
    ) -> Result<MicroGoal> {
        let sql = format!(
            r#"INSERT INTO {} (parent_goal_id, title, description, target_date, order_index)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
            self.table("micro_goals")
        );

        let params = vec![
            id_param(goal_id),
            json!(micro_goal.title),
            json!(micro_goal.description),
            date_param(micro_goal.target_date),
            json!(micro_goal.order_index.unwrap_or(0)),
        ];

        self.query_one(&sql, params)
            .await?
            .ok_or_else(|| AppError::Remote("Micro goal insert returned no row".to_string()))
    }

    async fn update_micro_goal(
        &self,
        goal_id: GoalId,
        micro_goal_id: RecordId,
        update: &MicroGoalUpdate,
    ) -> Result<MicroGoal> {
        let set = micro_goal_assignments(update);
        if set.is_empty() {
            return self.fetch_micro_goal(goal_id, micro_goal_id).await;
        }

        let id_placeholder = set.next_placeholder();
        let sql = format!(
            r#"UPDATE {} SET {}
               WHERE id = ${} AND parent_goal_id = ${}
               RETURNING *"#,
            self.table("micro_goals"),
            set.columns.join(", "),
            id_placeholder,
            id_placeholder + 1
        );
        let mut params = set.params;
        params.push(id_param(micro_goal_id));
        params.push(id_param(goal_id));

        self.query_one(&sql, params)
            .await?
            .ok_or_else(|| AppError::MicroGoalNotFound(micro_goal_id.to_string()))
    }

    async fn delete_micro_goal(&self, goal_id: GoalId, micro_goal_id: RecordId) -> Result<()> {
        let sql = format!(
            "DELETE FROM {} WHERE id = $1 AND parent_goal_id = $2 RETURNING id",
            self.table("micro_goals")
        );

        let deleted = self
            .executor
            .execute(&sql, vec![id_param(micro_goal_id), id_param(goal_id)])
            .await?;

        if deleted.is_empty() {
            return Err(AppError::MicroGoalNotFound(micro_goal_id.to_string()));
        }

        tracing::debug!("Deleted remote micro goal: {}", micro_goal_id);
        Ok(())
    }
}

#[async_trait]
impl PartnerRepository for RemoteRepository {
    async fn list_partners(&self, user_id: UserId) -> Result<Vec<AccountabilityPartner>> {
        let sql = format!(
            r#"SELECT * FROM {} WHERE user_id = $1 AND status = 'active'
               ORDER BY created_at DESC"#,
            self.table("accountability_partners")
        );
        self.query(&sql, vec![id_param(user_id)]).await
    }

    async fn insert_partner(
        &self,
        user_id: UserId,
        partner: NewPartner,
    ) -> Result<AccountabilityPartner> {
        let sql = format!(
            r#"INSERT INTO {} (user_id, partner_name, partner_email, shared_goals, privacy_settings)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING *"#,
            self.table("accountability_partners")
        );

        let params = vec![
            id_param(user_id),
            json!(partner.partner_name),
            json!(partner.partner_email),
            json!(serde_json::to_string(&partner.shared_goals)?),
            json!(serde_json::to_string(&partner.privacy_settings)?),
        ];

        self.query_one(&sql, params)
            .await?
            .ok_or_else(|| AppError::Remote("Partner insert returned no row".to_string()))
    }
}

#[async_trait]
impl ReflectionRepository for RemoteRepository {
    async fn list_reflections(&self, user_id: UserId, limit: i64) -> Result<Vec<Reflection>> {
        let sql = format!(
            r#"SELECT * FROM {} WHERE user_id = $1
               ORDER BY created_at DESC LIMIT $2"#,
            self.table("reflections")
        );
        self.query(&sql, vec![id_param(user_id), json!(limit)]).await
    }

    async fn insert_reflection(
        &self,
        user_id: UserId,
        prompt: &str,
        response: &str,
    ) -> Result<Reflection> {
        let sql = format!(
            r#"INSERT INTO {} (user_id, prompt, response)
               VALUES ($1, $2, $3)
               RETURNING *"#,
            self.table("reflections")
        );

        self.query_one(&sql, vec![id_param(user_id), json!(prompt), json!(response)])
            .await?
            .ok_or_else(|| AppError::Remote("Reflection insert returned no row".to_string()))
    }
}
