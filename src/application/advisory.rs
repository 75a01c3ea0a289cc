use crate::domain::models::{Priority, Task};
use crate::infrastructure::credential_store::ApiKeyStore;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::gemini_client::{GenerateRequest, GenerativeClient, DEFAULT_MODEL};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const API_KEY_ENV_VARS: &[&str] = &["ZENTASK_GEMINI_API_KEY", "GEMINI_API_KEY"];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskSuggestion {
    pub title: String,
    pub estimated_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PrioritySuggestion {
    pub task_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTaskDraft {
    pub title: String,
    pub category: String,
    pub priority: Priority,
    pub target_pomodoros: u32,
    pub deadline: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GoalSuggestion {
    pub title: String,
    pub reason: String,
    pub target: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductivityInsights {
    pub summary: String,
    pub tip: String,
}

impl ProductivityInsights {
    /// Neutral fallback used whenever the advisory call cannot produce a
    /// real answer.
    pub fn neutral() -> Self {
        Self {
            summary: "Great focus maintained.".to_string(),
            tip: "Try deep work sessions.".to_string(),
        }
    }
}

/// Stateless request/response advisory calls against the generative
/// backend. Methods return errors so the command layer can log them; the
/// command layer is the resiliency boundary that degrades every failure to
/// an empty or neutral result.
pub struct AdvisoryService<S, C>
where
    S: ApiKeyStore,
    C: GenerativeClient,
{
    api_key_store: Arc<S>,
    client: Arc<C>,
    model: String,
}

impl<S, C> AdvisoryService<S, C>
where
    S: ApiKeyStore,
    C: GenerativeClient,
{
    pub fn new(api_key_store: Arc<S>, client: Arc<C>) -> Self {
        Self {
            api_key_store,
            client,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn resolve_api_key(&self) -> Result<String, InfraError> {
        if let Some(stored) = self.api_key_store.load_key()? {
            let stored = stored.trim();
            if !stored.is_empty() {
                return Ok(stored.to_string());
            }
        }
        api_key_from_lookup(|key| std::env::var(key).ok()).ok_or_else(|| {
            InfraError::Credential(format!(
                "missing advisory api key (store one in the keyring or set one of: {})",
                API_KEY_ENV_VARS.join(", ")
            ))
        })
    }

    async fn request<T: DeserializeOwned>(
        &self,
        prompt: String,
        response_schema: serde_json::Value,
    ) -> Result<T, InfraError> {
        let api_key = self.resolve_api_key()?;
        let text = self
            .client
            .generate(
                &api_key,
                &self.model,
                &GenerateRequest {
                    prompt,
                    response_schema,
                },
            )
            .await?;
        serde_json::from_str(&text).map_err(|error| {
            InfraError::Advisory(format!("advisory payload did not match the declared shape: {error}; payload={text}"))
        })
    }

    pub async fn suggest_subtasks(
        &self,
        title: &str,
        description: Option<&str>,
    ) -> Result<Vec<SubtaskSuggestion>, InfraError> {
        let context = description
            .map(|description| format!(" (Context: {description})"))
            .unwrap_or_default();
        let prompt = format!(
            "You are a professional productivity consultant. Break down the task \
             \"{title}\"{context} into 3-6 actionable subtasks. Also provide an \
             estimated time in minutes for each."
        );
        let schema = serde_json::json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "title": {"type": "STRING"},
                    "estimatedMinutes": {"type": "NUMBER"}
                },
                "required": ["title", "estimatedMinutes"]
            }
        });
        self.request(prompt, schema).await
    }

    pub async fn suggest_chapters(&self, folder_name: &str) -> Result<Vec<String>, InfraError> {
        let prompt = format!(
            "List 5-8 essential chapters or modules for a student studying \
             \"{folder_name}\". Keep names concise."
        );
        let schema = serde_json::json!({
            "type": "ARRAY",
            "items": {"type": "STRING"}
        });
        self.request(prompt, schema).await
    }

    pub async fn prioritize_tasks(
        &self,
        tasks: &[Task],
    ) -> Result<Vec<PrioritySuggestion>, InfraError> {
        let prompt = format!(
            "Analyze these tasks and suggest the top 3 most important ones to do \
             next based on priority and deadline: {}",
            serde_json::to_string(tasks)?
        );
        let schema = serde_json::json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "taskId": {"type": "STRING"},
                    "reason": {"type": "STRING"}
                },
                "required": ["taskId", "reason"]
            }
        });
        self.request(prompt, schema).await
    }

    pub async fn parse_schedule_command(
        &self,
        command: &str,
        today: NaiveDate,
    ) -> Result<Vec<ScheduledTaskDraft>, InfraError> {
        let today = today.format("%Y-%m-%d");
        let prompt = format!(
            "Convert this scheduling command into a list of structured tasks: \
             \"{command}\".\n\
             Current Date context: {today}.\n\
             Rules:\n\
             1. Calculate 'targetPomodoros' assuming 1 Pomodoro = 25 minutes. If \
             user specifies \"3 hours\", that is roughly 7 pomodoros.\n\
             2. Assign a 'category' from [Study, Work, Personal, Strategy, \
             Fitness, Admin].\n\
             3. Assign a 'priority' from [low, medium, high].\n\
             4. Infer 'deadline' from the command. If no date is specified, use \
             today's date ({today}). Always return dates in YYYY-MM-DD format."
        );
        let schema = serde_json::json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "title": {"type": "STRING"},
                    "category": {"type": "STRING"},
                    "priority": {"type": "STRING"},
                    "targetPomodoros": {"type": "NUMBER"},
                    "deadline": {"type": "STRING"}
                },
                "required": ["title", "category", "priority", "targetPomodoros", "deadline"]
            }
        });
        self.request(prompt, schema).await
    }

    pub async fn suggest_goals(
        &self,
        recent_activity: &serde_json::Value,
    ) -> Result<Vec<GoalSuggestion>, InfraError> {
        let prompt = format!(
            "Based on this productivity history: {recent_activity}, suggest 2 \
             professional growth goals."
        );
        let schema = serde_json::json!({
            "type": "ARRAY",
            "items": {
                "type": "OBJECT",
                "properties": {
                    "title": {"type": "STRING"},
                    "reason": {"type": "STRING"},
                    "target": {"type": "NUMBER"}
                },
                "required": ["title", "reason", "target"]
            }
        });
        self.request(prompt, schema).await
    }

    pub async fn productivity_insights(
        &self,
        stats: &serde_json::Value,
    ) -> Result<ProductivityInsights, InfraError> {
        let prompt = format!(
            "Analyze this productivity data: {stats}. Provide a sophisticated \
             summary and tip."
        );
        let schema = serde_json::json!({
            "type": "OBJECT",
            "properties": {
                "summary": {"type": "STRING"},
                "tip": {"type": "STRING"}
            },
            "required": ["summary", "tip"]
        });
        self.request(prompt, schema).await
    }
}

fn api_key_from_lookup<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    for key in API_KEY_ENV_VARS {
        if let Some(value) = lookup(key) {
            let normalized = value.trim();
            if !normalized.is_empty() {
                return Some(normalized.to_string());
            }
        }
    }
    None
}
