//! Data models
//!
//! Rust structs representing goal tracker entities.
//! The same structs are decoded from remote query rows and from local store
//! JSON, so field decoding is lenient about how each backend spells values
//! (numeric ids as text, metadata as serialized JSON, timestamps with or
//! without a zone).

use crate::error::AppError;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Identifier shared by every stored record.
///
/// Remote rows carry SERIAL integers; records created in fallback mode use the
/// creation timestamp in milliseconds. Both are positive integers, so one
/// value type covers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RecordId(i64);

pub type GoalId = RecordId;
pub type UserId = RecordId;

impl RecordId {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn get(self) -> i64 {
        self.0
    }

    /// Normalize caller-supplied text into an id.
    ///
    /// Returns `None` for empty, non-numeric, zero or negative input.
    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim()
            .parse::<i64>()
            .ok()
            .filter(|value| *value > 0)
            .map(Self)
    }

    /// Normalize a JSON value (number or numeric string) into an id.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| {
                    n.as_f64()
                        .filter(|f| f.is_finite() && f.fract() == 0.0)
                        .map(|f| f as i64)
                })
                .filter(|value| *value > 0)
                .map(Self),
            Value::String(s) => Self::parse(s),
            _ => None,
        }
    }

    /// Id for a record created locally at `now`
    pub fn from_timestamp(now: DateTime<Utc>) -> Self {
        Self(now.timestamp_millis().max(1))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| AppError::Validation(format!("Invalid id: {:?}", s)))
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        RecordId::from_json(&value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid record id: {}", value)))
    }
}

/// Anything that may name a record: ids, integers, text, JSON values or nothing.
pub trait AsRecordId {
    fn as_record_id(&self) -> Option<RecordId>;
}

impl AsRecordId for RecordId {
    fn as_record_id(&self) -> Option<RecordId> {
        Some(*self)
    }
}

impl AsRecordId for i64 {
    fn as_record_id(&self) -> Option<RecordId> {
        (*self > 0).then_some(RecordId(*self))
    }
}

impl AsRecordId for str {
    fn as_record_id(&self) -> Option<RecordId> {
        RecordId::parse(self)
    }
}

impl AsRecordId for String {
    fn as_record_id(&self) -> Option<RecordId> {
        RecordId::parse(self)
    }
}

impl AsRecordId for Value {
    fn as_record_id(&self) -> Option<RecordId> {
        RecordId::from_json(self)
    }
}

impl<T: AsRecordId> AsRecordId for Option<T> {
    fn as_record_id(&self) -> Option<RecordId> {
        self.as_ref().and_then(AsRecordId::as_record_id)
    }
}

impl<T: AsRecordId + ?Sized> AsRecordId for &T {
    fn as_record_id(&self) -> Option<RecordId> {
        (**self).as_record_id()
    }
}

/// Goal cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    Daily,
    Weekly,
    Yearly,
}

impl GoalType {
    pub const ALL: [GoalType; 3] = [GoalType::Daily, GoalType::Weekly, GoalType::Yearly];

    pub fn as_str(&self) -> &'static str {
        match self {
            GoalType::Daily => "daily",
            GoalType::Weekly => "weekly",
            GoalType::Yearly => "yearly",
        }
    }
}

impl fmt::Display for GoalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GoalType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(GoalType::Daily),
            "weekly" => Ok(GoalType::Weekly),
            "yearly" => Ok(GoalType::Yearly),
            other => Err(AppError::Validation(format!("Unknown goal type: {}", other))),
        }
    }
}

/// Goal lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    #[default]
    Active,
    Completed,
    Archived,
}

impl GoalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Completed => "completed",
            GoalStatus::Archived => "archived",
        }
    }
}

impl FromStr for GoalStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(GoalStatus::Active),
            "completed" => Ok(GoalStatus::Completed),
            "archived" => Ok(GoalStatus::Archived),
            other => Err(AppError::Validation(format!("Unknown goal status: {}", other))),
        }
    }
}

/// Application user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub onboarding_completed: bool,
}

/// Partial user update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub onboarding_completed: Option<bool>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.onboarding_completed.is_none()
    }

    pub fn apply_to(&self, user: &mut User) {
        if let Some(name) = &self.name {
            user.name = name.clone();
        }
        if let Some(done) = self.onboarding_completed {
            user.onboarding_completed = done;
        }
    }
}

/// User record together with its password hash, as held by an account store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAccount {
    #[serde(flatten)]
    pub user: User,
    #[serde(default)]
    pub password_hash: String,
}

/// A tracked goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub goal_type: GoalType,
    #[serde(default = "default_target_value", deserialize_with = "lenient::integer")]
    pub target_value: i64,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub total_progress: i64,
    #[serde(deserialize_with = "lenient::date")]
    pub start_date: NaiveDate,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: GoalStatus,
    #[serde(default)]
    pub habit_stack_trigger: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_time")]
    pub reminder_time: Option<NaiveTime>,
    /// Open key-value map; stored remotely as serialized JSON text
    #[serde(default, deserialize_with = "lenient::json_or_default")]
    pub metadata: Map<String, Value>,
    #[serde(default = "Utc::now", deserialize_with = "lenient::datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient::opt_datetime")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_progress_date: Option<NaiveDate>,
}

fn default_target_value() -> i64 {
    1
}

impl Goal {
    /// Rounded completion percentage; 0 when the target is not positive
    pub fn progress_percentage(&self) -> i64 {
        progress_percentage(self.total_progress, self.target_value)
    }

    /// Whether accumulated progress has reached the target
    pub fn is_progress_complete(&self) -> bool {
        self.progress_percentage() >= 100
    }

    pub fn is_active(&self) -> bool {
        self.status == GoalStatus::Active
    }
}

/// Shared percentage rule used by every view of a goal.
pub fn progress_percentage(total_progress: i64, target_value: i64) -> i64 {
    if target_value <= 0 {
        return 0;
    }
    ((total_progress as f64 / target_value as f64) * 100.0).round() as i64
}

/// Create goal request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewGoal {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub goal_type: GoalType,
    pub target_value: i64,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub habit_stack_trigger: Option<String>,
    #[serde(default)]
    pub reminder_time: Option<NaiveTime>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl NewGoal {
    pub fn new(
        title: impl Into<String>,
        goal_type: GoalType,
        target_value: i64,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            title: title.into(),
            description: None,
            goal_type,
            target_value,
            start_date,
            end_date: None,
            habit_stack_trigger: None,
            reminder_time: None,
            metadata: Map::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Materialize the goal as created at `now` with the given id
    pub fn into_goal(self, id: GoalId, user_id: UserId, now: DateTime<Utc>) -> Goal {
        Goal {
            id,
            user_id: Some(user_id),
            title: self.title,
            description: self.description,
            goal_type: self.goal_type,
            target_value: self.target_value,
            total_progress: 0,
            start_date: self.start_date,
            end_date: self.end_date,
            status: GoalStatus::Active,
            habit_stack_trigger: self.habit_stack_trigger,
            reminder_time: self.reminder_time,
            metadata: self.metadata,
            created_at: now,
            completed_at: None,
            last_progress_date: None,
        }
    }
}

/// Partial goal update. `total_progress` is deliberately absent: it only
/// moves through progress logging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub goal_type: Option<GoalType>,
    pub target_value: Option<i64>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<GoalStatus>,
    pub habit_stack_trigger: Option<String>,
    pub reminder_time: Option<NaiveTime>,
    pub metadata: Option<Map<String, Value>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl GoalUpdate {
    /// Update marking a goal completed at `now`
    pub fn completion(now: DateTime<Utc>) -> Self {
        Self {
            status: Some(GoalStatus::Completed),
            completed_at: Some(now),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.goal_type.is_none()
            && self.target_value.is_none()
            && self.end_date.is_none()
            && self.status.is_none()
            && self.habit_stack_trigger.is_none()
            && self.reminder_time.is_none()
            && self.metadata.is_none()
            && self.completed_at.is_none()
    }

    pub fn apply_to(&self, goal: &mut Goal) {
        if let Some(title) = &self.title {
            goal.title = title.clone();
        }
        if let Some(description) = &self.description {
            goal.description = Some(description.clone());
        }
        if let Some(goal_type) = self.goal_type {
            goal.goal_type = goal_type;
        }
        if let Some(target) = self.target_value {
            goal.target_value = target;
        }
        if let Some(end_date) = self.end_date {
            goal.end_date = Some(end_date);
        }
        if let Some(status) = self.status {
            goal.status = status;
        }
        if let Some(trigger) = &self.habit_stack_trigger {
            goal.habit_stack_trigger = Some(trigger.clone());
        }
        if let Some(time) = self.reminder_time {
            goal.reminder_time = Some(time);
        }
        if let Some(metadata) = &self.metadata {
            goal.metadata = metadata.clone();
        }
        if let Some(completed_at) = self.completed_at {
            goal.completed_at = Some(completed_at);
        }
    }
}

/// Append-only progress record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressLogEntry {
    pub id: RecordId,
    pub goal_id: GoalId,
    #[serde(deserialize_with = "lenient::integer")]
    pub value: i64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(deserialize_with = "lenient::date")]
    pub logged_date: NaiveDate,
    #[serde(default = "Utc::now", deserialize_with = "lenient::datetime")]
    pub created_at: DateTime<Utc>,
}

/// Sub-step of a (usually yearly) goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicroGoal {
    pub id: RecordId,
    pub parent_goal_id: GoalId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_date")]
    pub target_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::boolean")]
    pub completed: bool,
    #[serde(default, deserialize_with = "lenient::integer")]
    pub order_index: i64,
    #[serde(default = "Utc::now", deserialize_with = "lenient::datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "lenient::opt_datetime")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Create micro goal request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMicroGoal {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub target_date: Option<NaiveDate>,
    #[serde(default)]
    pub order_index: Option<i64>,
}

/// Partial micro goal update. `completed_at: Some(None)` clears the timestamp.
#[derive(Debug, Clone, Default)]
pub struct MicroGoalUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub completed: Option<bool>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
}

impl MicroGoalUpdate {
    pub fn completion(completed: bool, now: DateTime<Utc>) -> Self {
        Self {
            completed: Some(completed),
            completed_at: Some(completed.then_some(now)),
            ..Self::default()
        }
    }

    pub fn apply_to(&self, micro_goal: &mut MicroGoal) {
        if let Some(title) = &self.title {
            micro_goal.title = title.clone();
        }
        if let Some(description) = &self.description {
            micro_goal.description = Some(description.clone());
        }
        if let Some(date) = self.target_date {
            micro_goal.target_date = Some(date);
        }
        if let Some(completed) = self.completed {
            micro_goal.completed = completed;
        }
        if let Some(completed_at) = self.completed_at {
            micro_goal.completed_at = completed_at;
        }
    }
}

/// What a partner is allowed to see
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrivacySettings {
    pub share_progress: bool,
    pub share_completions: bool,
    pub allow_encouragement: bool,
    pub share_reflections: bool,
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self {
            share_progress: true,
            share_completions: true,
            allow_encouragement: true,
            share_reflections: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartnerStatus {
    #[default]
    Active,
    Inactive,
}

/// Accountability partner linked to a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountabilityPartner {
    pub id: RecordId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub partner_name: String,
    pub partner_email: String,
    #[serde(default, deserialize_with = "lenient::json_or_default")]
    pub shared_goals: Vec<GoalId>,
    #[serde(default, deserialize_with = "lenient::json_or_default")]
    pub privacy_settings: PrivacySettings,
    #[serde(default)]
    pub status: PartnerStatus,
    #[serde(default = "Utc::now", deserialize_with = "lenient::datetime")]
    pub created_at: DateTime<Utc>,
}

/// Invite partner request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPartner {
    pub partner_name: String,
    pub partner_email: String,
    #[serde(default)]
    pub shared_goals: Vec<GoalId>,
    #[serde(default)]
    pub privacy_settings: PrivacySettings,
}

/// Saved reflection prompt/response pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    pub id: RecordId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub prompt: String,
    pub response: String,
    #[serde(default = "Utc::now", deserialize_with = "lenient::datetime")]
    pub created_at: DateTime<Utc>,
}

/// Decoders that accept both remote-row and local-JSON spellings of a value.
pub(crate) mod lenient {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
    use serde::de::{DeserializeOwned, Error};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn integer<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(0),
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64))
                .ok_or_else(|| D::Error::custom("integer out of range")),
            Some(Value::String(s)) => s.trim().parse().map_err(D::Error::custom),
            Some(other) => Err(D::Error::custom(format!("expected integer, got {}", other))),
        }
    }

    pub fn boolean<'de, D>(deserializer: D) -> Result<bool, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Bool(b)) => Ok(b),
            Some(Value::Number(n)) => Ok(n.as_i64().unwrap_or(0) != 0),
            Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "true" | "t" | "1" | "yes" => Ok(true),
                "false" | "f" | "0" | "no" | "" => Ok(false),
                other => Err(D::Error::custom(format!("expected boolean, got {}", other))),
            },
            Some(other) => Err(D::Error::custom(format!("expected boolean, got {}", other))),
        }
    }

    pub fn parse_date(raw: &str) -> Option<NaiveDate> {
        let raw = raw.trim();
        NaiveDate::parse_from_str(raw.get(..10)?, "%Y-%m-%d").ok()
    }

    pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        if let Ok(parsed) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%#z") {
            return Some(parsed.with_timezone(&Utc));
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(naive.and_utc());
            }
        }
        parse_date(raw)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    pub fn parse_time(raw: &str) -> Option<NaiveTime> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
            .ok()
    }

    pub fn date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_date(&raw).ok_or_else(|| D::Error::custom(format!("invalid date: {}", raw)))
    }

    pub fn opt_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(deserializer)?.and_then(|raw| parse_date(&raw)))
    }

    pub fn datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_datetime(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {}", raw)))
    }

    pub fn opt_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(deserializer)?.and_then(|raw| parse_datetime(&raw)))
    }

    pub fn opt_time<'de, D>(deserializer: D) -> Result<Option<NaiveTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(deserializer)?.and_then(|raw| parse_time(&raw)))
    }

    /// Accepts an embedded JSON value or its serialized text; anything
    /// unreadable becomes the default.
    pub fn json_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        let decoded = match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) if text.trim().is_empty() => None,
            Some(Value::String(text)) => serde_json::from_str::<T>(&text).ok(),
            Some(value) => serde_json::from_value::<T>(value).ok(),
        };
        Ok(decoded.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_id_normalization() {
        assert_eq!(RecordId::parse("42"), Some(RecordId::new(42)));
        assert_eq!(RecordId::parse(" 7 "), Some(RecordId::new(7)));
        assert_eq!(RecordId::parse("abc"), None);
        assert_eq!(RecordId::parse(""), None);
        assert_eq!(RecordId::parse("-3"), None);
        assert_eq!(RecordId::from_json(&json!(12)), Some(RecordId::new(12)));
        assert_eq!(RecordId::from_json(&json!("12")), Some(RecordId::new(12)));
        assert_eq!(RecordId::from_json(&json!(null)), None);
        assert_eq!(None::<&str>.as_record_id(), None);
    }

    #[test]
    fn test_percentage_guards_zero_target() {
        assert_eq!(progress_percentage(5, 0), 0);
        assert_eq!(progress_percentage(5, -2), 0);
        assert_eq!(progress_percentage(1, 3), 33);
        assert_eq!(progress_percentage(2, 3), 67);
        assert_eq!(progress_percentage(3, 2), 150);
    }

    #[test]
    fn test_goal_decodes_remote_row() {
        let row = json!({
            "id": 3,
            "user_id": "9",
            "title": "Run",
            "description": null,
            "goal_type": "weekly",
            "target_value": 3,
            "total_progress": null,
            "start_date": "2024-01-01T00:00:00.000Z",
            "end_date": null,
            "status": "active",
            "habit_stack_trigger": null,
            "reminder_time": "07:30:00",
            "metadata": "{\"color\":\"blue\"}",
            "created_at": "2024-01-02 10:11:12.345",
            "updated_at": "2024-01-02 10:11:12.345",
            "completed_at": null
        });

        let goal: Goal = serde_json::from_value(row).unwrap();
        assert_eq!(goal.id, RecordId::new(3));
        assert_eq!(goal.user_id, Some(RecordId::new(9)));
        assert_eq!(goal.total_progress, 0);
        assert_eq!(goal.start_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(goal.reminder_time, NaiveTime::from_hms_opt(7, 30, 0));
        assert_eq!(goal.metadata.get("color"), Some(&json!("blue")));
    }

    #[test]
    fn test_malformed_metadata_becomes_empty() {
        let row = json!({
            "id": 1,
            "title": "Read",
            "goal_type": "daily",
            "start_date": "2024-01-01",
            "metadata": "{not json"
        });

        let goal: Goal = serde_json::from_value(row).unwrap();
        assert!(goal.metadata.is_empty());
        assert_eq!(goal.target_value, 1);
        assert_eq!(goal.status, GoalStatus::Active);
    }

    #[test]
    fn test_partner_decodes_serialized_lists() {
        let row = json!({
            "id": 5,
            "partner_name": "Sam",
            "partner_email": "sam@example.com",
            "shared_goals": "[1, \"2\"]",
            "privacy_settings": "{\"shareReflections\": true}",
            "created_at": "2024-03-01T08:00:00Z"
        });

        let partner: AccountabilityPartner = serde_json::from_value(row).unwrap();
        assert_eq!(partner.shared_goals, vec![RecordId::new(1), RecordId::new(2)]);
        assert!(partner.privacy_settings.share_reflections);
        assert!(partner.privacy_settings.share_progress);
    }

    #[test]
    fn test_goal_update_leaves_progress_alone() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut goal = NewGoal::new("Read", GoalType::Daily, 1, start).into_goal(
            RecordId::new(1),
            RecordId::new(2),
            Utc::now(),
        );
        goal.total_progress = 4;

        let update = GoalUpdate {
            title: Some("Read more".to_string()),
            target_value: Some(10),
            ..GoalUpdate::default()
        };
        update.apply_to(&mut goal);

        assert_eq!(goal.title, "Read more");
        assert_eq!(goal.target_value, 10);
        assert_eq!(goal.total_progress, 4);
    }
}
