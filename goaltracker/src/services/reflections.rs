//! Reflection service
//!
//! Saved reflections go through the session's repository. When the user last
//! reflected is device state, so it always lives in the local store.

use crate::config::{DEFAULT_REFLECTION_LIMIT, ENTITY_LAST_REFLECTION, REFLECTION_INTERVAL_DAYS};
use crate::database::{LocalStore, Reflection, UserId};
use crate::error::{AppError, Result};
use crate::repository::ReflectionRepository;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct ReflectionService {
    user_id: UserId,
    repository: Arc<dyn ReflectionRepository>,
    store: LocalStore,
}

impl ReflectionService {
    pub fn new(
        user_id: UserId,
        repository: Arc<dyn ReflectionRepository>,
        store: LocalStore,
    ) -> Self {
        Self {
            user_id,
            repository,
            store,
        }
    }

    fn last_reflection_key(&self) -> String {
        self.store.key(ENTITY_LAST_REFLECTION, self.user_id)
    }

    /// Save a response and mark the user as having reflected now
    pub async fn save(&self, prompt: &str, response: &str) -> Result<Reflection> {
        if response.trim().is_empty() {
            return Err(AppError::Validation(
                "Reflection response cannot be empty".to_string(),
            ));
        }

        let reflection = self
            .repository
            .insert_reflection(self.user_id, prompt.trim(), response.trim())
            .await?;
        self.mark_reflected(reflection.created_at).await;

        Ok(reflection)
    }

    /// Most recent reflections; `None` uses the default limit
    pub async fn list_recent(&self, limit: Option<i64>) -> Result<Vec<Reflection>> {
        let limit = limit.unwrap_or(DEFAULT_REFLECTION_LIMIT).max(1);
        self.repository.list_reflections(self.user_id, limit).await
    }

    pub async fn last_reflected(&self) -> Option<DateTime<Utc>> {
        self.store.read(&self.last_reflection_key()).await
    }

    pub async fn mark_reflected(&self, at: DateTime<Utc>) {
        self.store.write(&self.last_reflection_key(), &at).await;
    }

    pub async fn is_due(&self) -> bool {
        self.is_due_at(Utc::now()).await
    }

    /// Due when the user never reflected or the interval has passed
    pub async fn is_due_at(&self, now: DateTime<Utc>) -> bool {
        match self.last_reflected().await {
            Some(last) => now - last >= Duration::days(REFLECTION_INTERVAL_DAYS),
            None => true,
        }
    }
}
