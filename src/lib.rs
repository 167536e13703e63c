#![forbid(unsafe_code)]

//! `task-funnel` — multi-channel task capture.
//!
//! Watches an IMAP folder, a WhatsApp-style webhook, and a Slack slash
//! command; expands each inbound text into a structured task via an LLM
//! chat completion; and persists the task as a page in a Notion database.

pub mod agent;
pub mod config;
pub mod errors;
pub mod mail;
pub mod models;
pub mod pipeline;
pub mod sink;
pub mod slack;
pub mod webhook;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
