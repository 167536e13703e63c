//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing, validation, or credential-loading failure.
    Config(String),
    /// IMAP connection, folder, or message failure.
    Mail(String),
    /// Task expansion (LLM) request failure.
    Agent(String),
    /// Notion page-create failure.
    Sink(String),
    /// Slack API or Socket Mode failure.
    Slack(String),
    /// Webhook HTTP listener failure.
    Http(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Mail(msg) => write!(f, "mail: {msg}"),
            Self::Agent(msg) => write!(f, "agent: {msg}"),
            Self::Sink(msg) => write!(f, "sink: {msg}"),
            Self::Slack(msg) => write!(f, "slack: {msg}"),
            Self::Http(msg) => write!(f, "http: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}
