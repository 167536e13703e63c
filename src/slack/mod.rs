//! Slack Socket Mode integration: outbound client and slash command handler.

pub mod client;
pub mod commands;
