//! Slack Socket Mode client with a small buffered send queue.

use std::sync::Arc;
use std::time::Duration;

use slack_morphism::prelude::{
    SlackApiChatPostMessageRequest, SlackApiToken, SlackApiTokenType, SlackApiTokenValue,
    SlackChannelId, SlackClient, SlackClientEventsListenerEnvironment,
    SlackClientHyperHttpsConnector, SlackClientSocketModeConfig, SlackClientSocketModeListener,
    SlackMessageContent, SlackSocketModeListenerCallbacks,
};
use tokio::{sync::mpsc, task::JoinHandle, time::sleep};
use tracing::{error, info, warn};

use crate::config::SlackConfig;
use crate::pipeline::AppState;
use crate::slack::commands;
use crate::{AppError, Result};

const QUEUE_CAPACITY: usize = 256;
const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Plain-text message to be delivered via chat.postMessage.
#[derive(Debug, Clone)]
pub struct SlackMessage {
    /// Destination channel.
    pub channel: SlackChannelId,
    /// Message text.
    pub text: String,
}

impl SlackMessage {
    fn into_request(self) -> SlackApiChatPostMessageRequest {
        let content = SlackMessageContent {
            text: Some(self.text),
            blocks: None,
            attachments: None,
            upload: None,
            files: None,
            reactions: None,
            metadata: None,
        };

        SlackApiChatPostMessageRequest {
            channel: self.channel,
            content,
            as_user: None,
            icon_emoji: None,
            icon_url: None,
            link_names: Some(true),
            parse: None,
            thread_ts: None,
            username: None,
            reply_broadcast: None,
            unfurl_links: None,
            unfurl_media: None,
        }
    }
}

/// Slack wrapper that owns a rate-limited outgoing queue and the
/// Socket Mode listener for slash commands.
pub struct SlackService {
    client: Arc<SlackClient<SlackClientHyperHttpsConnector>>,
    app_token: SlackApiToken,
    queue_tx: mpsc::Sender<SlackMessage>,
}

impl SlackService {
    /// Create the HTTPS client and start the background sender task.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` if the HTTPS connector cannot be created.
    pub fn connect(config: &SlackConfig) -> Result<(Self, JoinHandle<()>)> {
        let connector = SlackClientHyperHttpsConnector::new()
            .map_err(|err| AppError::Slack(format!("failed to init slack connector: {err}")))?;
        let client = Arc::new(SlackClient::new(connector));
        let bot_token = SlackApiToken {
            token_value: SlackApiTokenValue(config.bot_token.clone()),
            cookie: None,
            team_id: None,
            scope: None,
            token_type: Some(SlackApiTokenType::Bot),
        };
        let app_token = SlackApiToken {
            token_value: SlackApiTokenValue(config.app_token.clone()),
            cookie: None,
            team_id: None,
            scope: None,
            token_type: Some(SlackApiTokenType::App),
        };

        let (queue_tx, queue_rx) = mpsc::channel(QUEUE_CAPACITY);
        let queue_task = Self::spawn_worker(Arc::clone(&client), bot_token, queue_rx);

        info!("slack service started with buffered queue");

        Ok((
            Self {
                client,
                app_token,
                queue_tx,
            },
            queue_task,
        ))
    }

    /// Enqueue a plain-text message for async delivery.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Slack` if the message queue is full.
    pub async fn post(&self, channel: SlackChannelId, text: impl Into<String>) -> Result<()> {
        self.queue_tx
            .send(SlackMessage {
                channel,
                text: text.into(),
            })
            .await
            .map_err(|err| AppError::Slack(format!("failed to enqueue slack message: {err}")))
    }

    fn spawn_worker(
        client: Arc<SlackClient<SlackClientHyperHttpsConnector>>,
        token: SlackApiToken,
        mut queue_rx: mpsc::Receiver<SlackMessage>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let session = client.open_session(&token);
            while let Some(message) = queue_rx.recv().await {
                let request = message.into_request();
                let mut backoff = INITIAL_RETRY_DELAY;
                loop {
                    match session.chat_post_message(&request).await {
                        Ok(_) => {
                            info!("sent slack message");
                            break;
                        }
                        Err(error) => {
                            let delay = match &error {
                                slack_morphism::errors::SlackClientError::RateLimitError(rate) => {
                                    rate.retry_after.unwrap_or(backoff)
                                }
                                _ => backoff,
                            };
                            warn!(?error, delay=?delay, "slack post failed; retrying");
                            sleep(delay).await;
                            backoff = (backoff * 2).min(MAX_RETRY_DELAY);
                        }
                    }
                }
            }
            info!("slack sender task exiting");
        })
    }

    /// Start the Socket Mode listener that receives slash commands.
    ///
    /// The shared [`AppState`] is injected as user state so the command
    /// handler can reach the agent, sink, and this service.
    pub fn start_socket_mode(&self, state: Arc<AppState>) -> JoinHandle<()> {
        let listener_env = Arc::new(
            SlackClientEventsListenerEnvironment::new(Arc::clone(&self.client))
                .with_error_handler(|err, _client, _state| {
                    error!(?err, "socket mode error");
                    axum::http::StatusCode::INTERNAL_SERVER_ERROR
                })
                .with_user_state(state),
        );
        let callbacks = SlackSocketModeListenerCallbacks::new()
            .with_hello_events(|event, _client, _state| async move {
                info!(?event, "socket hello");
            })
            .with_command_events(commands::handle_command)
            .with_push_events(|event, _client, _state| async move {
                info!(?event, "push event ignored");
                Ok(())
            });
        let config = SlackClientSocketModeConfig {
            max_connections_count: SlackClientSocketModeConfig::DEFAULT_CONNECTIONS_COUNT,
            debug_connections: SlackClientSocketModeConfig::DEFAULT_DEBUG_CONNECTIONS,
            initial_backoff_in_seconds:
                SlackClientSocketModeConfig::DEFAULT_INITIAL_BACKOFF_IN_SECONDS,
            reconnect_timeout_in_seconds:
                SlackClientSocketModeConfig::DEFAULT_RECONNECT_TIMEOUT_IN_SECONDS,
            ping_interval_in_seconds: SlackClientSocketModeConfig::DEFAULT_PING_INTERVAL_IN_SECONDS,
            ping_failure_threshold_times:
                SlackClientSocketModeConfig::DEFAULT_PING_FAILURE_THRESHOLD_TIMES,
        };

        let listener = SlackClientSocketModeListener::new(&config, listener_env, callbacks);
        let app_token = self.app_token.clone();
        tokio::spawn(async move {
            if let Err(error) = listener.listen_for(&app_token).await {
                error!(?error, "socket mode listen failed");
                return;
            }

            listener.serve().await;
            info!("socket mode listener exited");
        })
    }
}
