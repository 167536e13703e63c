//! Global configuration parsing, validation, and credential loading.

use std::env;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crate::{AppError, Result};

/// Keychain service name used for credential lookups.
const KEYCHAIN_SERVICE: &str = "task-funnel";

/// IMAP mailbox configuration for the email ingestion loop.
///
/// The account password is loaded at runtime via OS keychain or
/// environment variables, not from the TOML config file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct MailConfig {
    /// IMAP server host, e.g. `imap.gmail.com`.
    pub server: String,
    /// IMAP-over-TLS port.
    #[serde(default = "default_imap_port")]
    pub port: u16,
    /// Watched label/folder polled for inbound items.
    pub folder: String,
    /// Seconds to sleep between poll cycles.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Maximum number of body characters handed to the agent.
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
    /// Copy processed messages to `inbox_folder` before deletion so
    /// they are not permanently lost.
    #[serde(default = "default_true")]
    pub recopy_to_inbox: bool,
    /// Destination folder for the pre-deletion copy.
    #[serde(default = "default_inbox_folder")]
    pub inbox_folder: String,
    /// Account username (populated at runtime).
    #[serde(skip)]
    pub user: String,
    /// Account password (populated at runtime).
    #[serde(skip)]
    pub password: String,
}

/// Slack configuration for Socket Mode connectivity.
///
/// Tokens are loaded at runtime via OS keychain or environment variables,
/// not from the TOML config file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SlackConfig {
    /// Registered slash command that captures a task.
    #[serde(default = "default_command")]
    pub command: String,
    /// App-level token used for Socket Mode (populated at runtime).
    #[serde(skip)]
    pub app_token: String,
    /// Bot user token used for posting messages (populated at runtime).
    #[serde(skip)]
    pub bot_token: String,
}

/// Task expansion agent (LLM) configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct AgentConfig {
    /// Chat-completion model identifier.
    #[serde(default = "default_model")]
    pub model: String,
    /// API base URL; overridable for tests.
    #[serde(default = "default_openai_base")]
    pub api_base: String,
    /// API key (populated at runtime).
    #[serde(skip)]
    pub api_key: String,
}

/// Notion sink configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct NotionConfig {
    /// Parent database that receives created task pages.
    pub database_id: String,
    /// API base URL; overridable for tests.
    #[serde(default = "default_notion_base")]
    pub api_base: String,
    /// Integration token (populated at runtime).
    #[serde(skip)]
    pub token: String,
}

/// Webhook HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct WebhookConfig {
    /// Listen port for the inbound message webhook.
    #[serde(default = "default_webhook_port")]
    pub port: u16,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            port: default_webhook_port(),
        }
    }
}

fn default_imap_port() -> u16 {
    993
}

fn default_poll_interval() -> u64 {
    30
}

fn default_body_limit() -> usize {
    2000
}

fn default_true() -> bool {
    true
}

fn default_inbox_folder() -> String {
    "INBOX".into()
}

fn default_command() -> String {
    "/task".into()
}

fn default_model() -> String {
    "gpt-4o-mini".into()
}

fn default_openai_base() -> String {
    "https://api.openai.com".into()
}

fn default_notion_base() -> String {
    "https://api.notion.com".into()
}

fn default_webhook_port() -> u16 {
    5050
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Email ingestion settings.
    pub mail: MailConfig,
    /// Slack connectivity settings.
    pub slack: SlackConfig,
    /// Task expansion agent settings.
    pub agent: AgentConfig,
    /// Notion sink settings.
    pub notion: NotionConfig,
    /// Webhook listener settings.
    #[serde(default)]
    pub webhook: WebhookConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load all secrets from OS keychain with env-var fallback.
    ///
    /// Any missing secret is a fatal configuration error: the process
    /// must not start half-connected.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the missing credential.
    pub async fn load_credentials(&mut self) -> Result<()> {
        self.slack.app_token = load_credential("slack_app_token", "SLACK_APP_TOKEN").await?;
        self.slack.bot_token = load_credential("slack_bot_token", "SLACK_BOT_TOKEN").await?;
        self.agent.api_key = load_credential("openai_api_key", "OPENAI_API_KEY").await?;
        self.notion.token = load_credential("notion_token", "NOTION_TOKEN").await?;
        self.mail.user = load_credential("mail_user", "MAIL_USER").await?;
        self.mail.password = load_credential("mail_password", "MAIL_PASSWORD").await?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.mail.folder.trim().is_empty() {
            return Err(AppError::Config("mail.folder must not be empty".into()));
        }

        if self.mail.poll_interval_seconds == 0 {
            return Err(AppError::Config(
                "mail.poll_interval_seconds must be greater than zero".into(),
            ));
        }

        if self.mail.body_limit == 0 {
            return Err(AppError::Config(
                "mail.body_limit must be greater than zero".into(),
            ));
        }

        if self.notion.database_id.trim().is_empty() {
            return Err(AppError::Config(
                "notion.database_id must not be empty".into(),
            ));
        }

        if !self.slack.command.starts_with('/') {
            return Err(AppError::Config(
                "slack.command must start with '/'".into(),
            ));
        }

        Ok(())
    }
}

/// Load a single credential from OS keychain with env-var fallback.
async fn load_credential(keyring_key: &str, env_key: &str) -> Result<String> {
    let key = keyring_key.to_owned();

    // Try OS keychain first via spawn_blocking (keyring is synchronous I/O).
    let keychain_result = tokio::task::spawn_blocking(move || {
        keyring::Entry::new(KEYCHAIN_SERVICE, &key).and_then(|entry| entry.get_password())
    })
    .await
    .map_err(|err| AppError::Config(format!("keychain task panicked: {err}")))?;

    match keychain_result {
        Ok(value) if !value.is_empty() => return Ok(value),
        Ok(_) => {
            warn!(key = keyring_key, "keychain entry is empty, trying env var");
        }
        Err(err) => {
            warn!(
                key = keyring_key,
                ?err,
                "keychain lookup failed, trying env var"
            );
        }
    }

    // Fallback to environment variable.
    env::var(env_key).map_err(|_| {
        AppError::Config(format!(
            "credential {keyring_key} not found in keychain or {env_key} env var"
        ))
    })
}
