//! Slack slash command handler.
//!
//! The Socket Mode framework enforces a short ack deadline, so the
//! synchronous response is an immediate "Processing…" line; the actual
//! Agent → Sink work runs in a spawned task that posts the outcome back
//! to the invoking channel.

use std::sync::Arc;

use slack_morphism::prelude::{
    SlackClient, SlackClientEventsUserState, SlackClientHyperHttpsConnector, SlackCommandEvent,
    SlackCommandEventResponse, SlackMessageContent, SlackMessageResponseType,
};
use tracing::{error, info, warn};

use crate::models::inbound::InboundItem;
use crate::pipeline::{self, AppState};
use crate::sink::SinkOutcome;

/// Handle an incoming slash command routed via Socket Mode.
///
/// Empty command text is rejected with a usage hint and no Agent/Sink
/// call is made.
///
/// # Errors
///
/// Returns an error if the command response cannot be constructed.
pub async fn handle_command(
    event: SlackCommandEvent,
    _client: Arc<SlackClient<SlackClientHyperHttpsConnector>>,
    state: SlackClientEventsUserState,
) -> slack_morphism::AnyStdResult<SlackCommandEventResponse> {
    info!(command = ?event.command, user = ?event.user_id, "received slash command");

    let app: Option<Arc<AppState>> = {
        let guard = state.read().await;
        guard.get_user_state::<Arc<AppState>>().cloned()
    };
    let Some(app) = app else {
        warn!("app state not available; cannot process command");
        return Ok(ephemeral("Task capture is not ready yet. Try again shortly."));
    };

    if event.command.0 != app.config.slack.command {
        warn!(command = %event.command.0, "unregistered slash command ignored");
        return Ok(ephemeral(format!(
            "Unknown command. Use {} <task description>",
            app.config.slack.command
        )));
    }

    let text = event
        .text
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_owned();
    if text.is_empty() {
        return Ok(ephemeral(format!(
            "Usage: {} <task description>",
            app.config.slack.command
        )));
    }

    let ack = ephemeral(format!("Processing: {text}\u{2026}"));
    let channel = event.channel_id.clone();

    // Ack first; the capture runs detached and reports to the channel.
    tokio::spawn(async move {
        let inbound = InboundItem::SlashCommand {
            text,
            channel_id: channel.to_string(),
        };
        let outcome = pipeline::capture(&app, &inbound).await;
        let reply = match outcome {
            SinkOutcome::Created { url } => format!("Task captured: {url}"),
            SinkOutcome::Failed { reason } => {
                warn!(%reason, "slash command capture failed");
                "Could not save the task. Check server logs.".to_owned()
            }
        };
        if let Some(ref slack) = app.slack {
            if let Err(err) = slack.post(channel, reply).await {
                error!(%err, "failed to post command outcome");
            }
        }
    });

    Ok(ack)
}

fn ephemeral(text: impl Into<String>) -> SlackCommandEventResponse {
    SlackCommandEventResponse {
        content: SlackMessageContent {
            text: Some(text.into()),
            blocks: None,
            attachments: None,
            upload: None,
            files: None,
            reactions: None,
            metadata: None,
        },
        response_type: Some(SlackMessageResponseType::Ephemeral),
    }
}
