//! Notion page-create sink.
//!
//! One REST call per task record. The sink never raises past its
//! boundary: every call returns a tagged [`SinkOutcome`] so callers and
//! tests can inspect the failure cause. There is no idempotency key;
//! calling twice with the same record creates two pages.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::{error, info};

use crate::config::NotionConfig;
use crate::models::task::TaskRecord;
use crate::{AppError, Result};

/// Pinned Notion API revision.
pub const NOTION_VERSION: &str = "2022-06-28";

/// Bound on a single page-create round trip.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Result of one page-create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkOutcome {
    /// Page created; carries the new page's URL.
    Created {
        /// URL of the created page.
        url: String,
    },
    /// Create call failed; the reason is for logs and tests, not retries.
    Failed {
        /// Human-readable failure cause.
        reason: String,
    },
}

/// Adapter that persists task records as Notion database pages.
#[derive(Debug, Clone)]
pub struct NotionSink {
    http: reqwest::Client,
    api_base: String,
    token: String,
    database_id: String,
}

impl NotionSink {
    /// Build a sink from configuration. The token must already be loaded.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Sink` if the HTTP client cannot be constructed.
    pub fn new(config: &NotionConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| AppError::Sink(format!("failed to build http client: {err}")))?;
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            token: config.token.clone(),
            database_id: config.database_id.clone(),
        })
    }

    /// Create one page for the record, returning the page URL on success.
    pub async fn create_task(&self, record: &TaskRecord) -> SinkOutcome {
        let payload = build_page_payload(&self.database_id, record);

        let response = match self
            .http
            .post(format!("{}/v1/pages", self.api_base))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                error!(%err, "notion request failed");
                return SinkOutcome::Failed {
                    reason: format!("request failed: {err}"),
                };
            }
        };

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(%status, body = %error_body, "notion rejected page create");
            return SinkOutcome::Failed {
                reason: format!("notion returned {status}"),
            };
        }

        match response.json::<Value>().await {
            Ok(page) => match page["url"].as_str() {
                Some(url) => {
                    info!(%url, task = %record.name, "task page created");
                    SinkOutcome::Created { url: url.into() }
                }
                None => SinkOutcome::Failed {
                    reason: "create response has no url".into(),
                },
            },
            Err(err) => SinkOutcome::Failed {
                reason: format!("create response is not JSON: {err}"),
            },
        }
    }
}

/// Map a task record to the Notion page-create payload.
///
/// The `Source URL` property is attached only when the link starts with
/// an http scheme; the API rejects the whole request on a malformed url
/// value, so anything else is omitted entirely. `Priority` is sent as-is
/// with no enum enforcement.
#[must_use]
pub fn build_page_payload(database_id: &str, record: &TaskRecord) -> Value {
    let mut properties = json!({
        "Task": { "title": [ { "text": { "content": record.name } } ] },
        "Description": { "rich_text": [ { "text": { "content": record.description } } ] },
        "Priority": { "select": { "name": record.priority } },
    });

    if let Some(link) = record.source_link.as_deref() {
        if link.starts_with("http") {
            properties["Source URL"] = json!({ "url": link });
        }
    }

    json!({
        "parent": { "database_id": database_id },
        "properties": properties,
    })
}
