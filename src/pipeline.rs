//! Shared application state and the capture step all channels run.

use std::sync::Arc;

use crate::agent::TaskAgent;
use crate::models::inbound::InboundItem;
use crate::sink::{NotionSink, SinkOutcome};
use crate::slack::client::SlackService;
use crate::GlobalConfig;

/// Read-only state shared by the three ingestion paths.
///
/// Contains only configuration and the stateless adapters, so no
/// locking is needed across channels.
pub struct AppState {
    /// Validated configuration with credentials loaded.
    pub config: Arc<GlobalConfig>,
    /// Text-to-task expansion adapter.
    pub agent: TaskAgent,
    /// Notion page-create adapter.
    pub sink: NotionSink,
    /// Outbound Slack service; absent in webhook-only test setups.
    pub slack: Option<Arc<SlackService>>,
}

/// Run one inbound item through Agent → Sink.
///
/// The agent boundary is infallible (it degrades instead of failing),
/// so the only observable failure is the sink's tagged outcome.
pub async fn capture(state: &AppState, item: &InboundItem) -> SinkOutcome {
    let raw_text = item.raw_text();
    let record = state
        .agent
        .expand(&raw_text)
        .await
        .with_source_link(item.source_link());
    state.sink.create_task(&record).await
}
