//! Task expansion agent backed by an OpenAI chat completion.
//!
//! The agent boundary is infallible: any transport failure, non-2xx
//! status, non-JSON reply, or missing key degrades to a usable record
//! instead of propagating. There is no retry and no timeout beyond the
//! HTTP client default.

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::AgentConfig;
use crate::models::task::{
    title_from_raw, TaskRecord, DEFAULT_PRIORITY, PLACEHOLDER_DESCRIPTION,
};
use crate::{AppError, Result};

/// Fixed instruction sent with every expansion request.
const SYSTEM_PROMPT: &str = "You are a Task Expansion Agent. Given a raw note, \
extract an action-oriented task title, extrapolate a short workflow description \
with bullet points, and infer a priority (High, Medium, or Low) from urgency and \
revenue impact. OUTPUT JSON ONLY: \
{\"name\": \"...\", \"description\": \"...\", \"priority\": \"...\"}";

/// Text-to-task adapter around the chat-completion API.
#[derive(Debug, Clone)]
pub struct TaskAgent {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl TaskAgent {
    /// Build an agent from configuration. Credentials must already be
    /// loaded into the config.
    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    /// Expand raw text into a task record.
    ///
    /// Never fails: provider errors yield the degraded record built from
    /// the raw input, so the caller always receives a persistable task.
    pub async fn expand(&self, raw_text: &str) -> TaskRecord {
        debug!(chars = raw_text.len(), "expanding inbound text");
        match self.complete(raw_text).await {
            Ok(content) => parse_reply(raw_text, &content),
            Err(err) => {
                warn!(%err, "expansion call failed; using degraded record");
                TaskRecord::degraded(raw_text)
            }
        }
    }

    /// One chat-completion round trip, returning the reply content.
    async fn complete(&self, raw_text: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": format!("Input: {raw_text}") },
            ],
            "response_format": { "type": "json_object" },
        });

        let response = self
            .http
            .post(format!("{}/v1/chat/completions", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| AppError::Agent(format!("completion request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(AppError::Agent(format!(
                "completion returned {status}: {error_body}"
            )));
        }

        let reply: Value = response
            .json()
            .await
            .map_err(|err| AppError::Agent(format!("completion reply is not JSON: {err}")))?;

        reply["choices"][0]["message"]["content"]
            .as_str()
            .map(ToOwned::to_owned)
            .ok_or_else(|| AppError::Agent("completion reply has no message content".into()))
    }
}

/// Parse the model's JSON-object reply into a task record.
///
/// Each key degrades independently: a missing or empty `name` falls back
/// to a prefix of the raw input, `description` to a fixed placeholder,
/// `priority` to the default. Non-object content yields the fully
/// degraded record.
#[must_use]
pub fn parse_reply(raw_text: &str, content: &str) -> TaskRecord {
    let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(content) else {
        warn!("agent reply is not a JSON object; using degraded record");
        return TaskRecord::degraded(raw_text);
    };

    let text_field = |key: &str| -> Option<String> {
        fields
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned)
    };

    TaskRecord {
        name: text_field("name").unwrap_or_else(|| title_from_raw(raw_text)),
        description: text_field("description")
            .unwrap_or_else(|| PLACEHOLDER_DESCRIPTION.into()),
        priority: text_field("priority").unwrap_or_else(|| DEFAULT_PRIORITY.into()),
        source_link: None,
    }
}
