//! Client for the hosted prompt service
//!
//! Named prompt templates are registered once with `setup_prompt` and then
//! applied to input data with `apply_prompt`. Output is either free text or
//! JSON depending on the requested `ReturnType`.

use super::client::{authorize, build_client, endpoint_url, RemoteCredentials};
use crate::config::{APPLY_PROMPT_ENDPOINT, SETUP_PROMPT_ENDPOINT};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Output format requested from the prompt service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnType {
    PrettyText,
    Json,
}

/// A prompt template registered with the service
#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub input_variables: &'static [&'static str],
    pub text: &'static str,
}

pub const CONTEXTUAL_SUGGESTIONS_PROMPT: &str = "contextual_goal_suggestions";
pub const HABIT_STACKING_PROMPT: &str = "habit_stacking_suggestions";
pub const MICRO_GOAL_PROMPT: &str = "micro_goal_breakdown";
pub const REFLECTION_PROMPT: &str = "reflection_prompts";

pub const PROMPT_TEMPLATES: &[PromptTemplate] = &[
    PromptTemplate {
        name: CONTEXTUAL_SUGGESTIONS_PROMPT,
        input_variables: &["user_context", "existing_goals", "user_preferences"],
        text: "Based on the user's context: {user_context}, existing goals: {existing_goals}, \
               and preferences: {user_preferences}, suggest 3 relevant goals in JSON format. \
               Each goal should have: title, description, goal_type (daily/weekly/yearly), \
               and reasoning. Return as a JSON array.",
    },
    PromptTemplate {
        name: HABIT_STACKING_PROMPT,
        input_variables: &["existing_habits", "new_goal", "user_schedule"],
        text: "Given existing habits: {existing_habits}, new goal: {new_goal}, and schedule: \
               {user_schedule}, suggest 3 habit stacking combinations in the format \
               \"After I [existing habit], I will [work on new goal]\". Return as plain text, \
               one per line.",
    },
    PromptTemplate {
        name: MICRO_GOAL_PROMPT,
        input_variables: &["yearly_goal", "timeline", "constraints"],
        text: "Break down this yearly goal: {yearly_goal} into 3-5 micro goals over timeline: \
               {timeline} with constraints: {constraints}. Return JSON array with objects \
               containing: title, description, target_date, order_index.",
    },
    PromptTemplate {
        name: REFLECTION_PROMPT,
        input_variables: &["goal_progress", "challenges", "goal_type"],
        text: "Generate 3 thoughtful reflection questions based on goal progress: \
               {goal_progress}, challenges: {challenges}, and goal type: {goal_type}. \
               Return JSON array with objects containing: question, purpose.",
    },
];

#[derive(Serialize)]
struct SetupRequest<'a> {
    prompt_name: &'a str,
    input_variables: &'a [&'a str],
    prompt_text: &'a str,
}

#[derive(Serialize)]
struct ApplyRequest<'a> {
    prompt_name: &'a str,
    input_data: Map<String, Value>,
}

#[derive(Deserialize)]
struct ApplyResponse {
    #[serde(default)]
    value: Option<Value>,
}

/// HTTP client for prompt registration and execution
#[derive(Clone)]
pub struct PromptClient {
    client: reqwest::Client,
    base_url: String,
    credentials: RemoteCredentials,
}

impl PromptClient {
    pub fn new(base_url: &str, credentials: RemoteCredentials) -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            base_url: base_url.to_string(),
            credentials,
        })
    }

    /// Register a named prompt template
    pub async fn setup_prompt(
        &self,
        name: &str,
        input_variables: &[&str],
        template: &str,
    ) -> Result<()> {
        let request = self
            .client
            .post(endpoint_url(&self.base_url, SETUP_PROMPT_ENDPOINT))
            .json(&SetupRequest {
                prompt_name: name,
                input_variables,
                prompt_text: template,
            });

        let response = authorize(request, &self.credentials).send().await?;
        if !response.status().is_success() {
            tracing::warn!("Prompt setup failed for {}: {}", name, response.status());
            return Err(AppError::Remote(format!(
                "Prompt setup failed: HTTP {}",
                response.status().as_u16()
            )));
        }

        tracing::debug!("Registered prompt: {}", name);
        Ok(())
    }

    /// Register every built-in template, stopping at the first failure
    pub async fn setup_all(&self) -> Result<()> {
        for template in PROMPT_TEMPLATES {
            self.setup_prompt(template.name, template.input_variables, template.text)
                .await?;
        }
        tracing::info!("Prompt templates registered");
        Ok(())
    }

    /// Apply a named prompt to `input`; returns the service's `value`
    pub async fn apply_prompt(
        &self,
        name: &str,
        mut input: Map<String, Value>,
        return_type: ReturnType,
    ) -> Result<Value> {
        input.insert("return_type".to_string(), serde_json::to_value(return_type)?);

        let request = self
            .client
            .post(endpoint_url(&self.base_url, APPLY_PROMPT_ENDPOINT))
            .json(&ApplyRequest {
                prompt_name: name,
                input_data: input,
            });

        let response = authorize(request, &self.credentials).send().await?;
        if !response.status().is_success() {
            tracing::warn!("Prompt {} failed: {}", name, response.status());
            return Err(AppError::Remote(format!(
                "Prompt application failed: HTTP {}",
                response.status().as_u16()
            )));
        }

        let body: ApplyResponse = response
            .json()
            .await
            .map_err(|e| AppError::Remote(format!("Malformed prompt response: {}", e)))?;

        body.value
            .filter(|value| !value.is_null())
            .ok_or_else(|| AppError::Remote(format!("Prompt {} returned no value", name)))
    }
}
