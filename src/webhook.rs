//! Inbound message webhook (Twilio/WhatsApp style).
//!
//! `POST /whatsapp` takes a form-encoded `Body` + `From` pair and replies
//! with a small TwiML XML payload. Agent or sink failures become a
//! user-visible failure reply, never an HTTP 500.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Form, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::models::inbound::InboundItem;
use crate::pipeline::{self, AppState};
use crate::sink::SinkOutcome;
use crate::{AppError, Result};

/// Reply sent verbatim when the inbound body is empty.
pub const EMPTY_MESSAGE_REPLY: &str = "Empty message received.";

/// Reply sent when the sink could not persist the task.
pub const SINK_FAILURE_REPLY: &str = "Could not save the task. Check server logs.";

/// Form fields Twilio posts for an inbound message.
#[derive(Debug, Deserialize)]
pub struct InboundForm {
    /// Message text.
    #[serde(default, rename = "Body")]
    pub body: String,
    /// Sender identifier, e.g. `whatsapp:+15551234567`.
    #[serde(default, rename = "From")]
    pub from: String,
}

/// Handler for `GET /health` — returns 200 OK with a plain-text body.
async fn health() -> &'static str {
    "ok"
}

async fn whatsapp_reply(
    State(state): State<Arc<AppState>>,
    Form(form): Form<InboundForm>,
) -> Response {
    let text = form.body.trim().to_owned();
    info!(sender = %form.from, chars = text.len(), "webhook message received");

    if text.is_empty() {
        return xml_response(EMPTY_MESSAGE_REPLY);
    }

    let inbound = InboundItem::WhatsApp {
        text,
        sender: form.from,
    };
    match pipeline::capture(&state, &inbound).await {
        SinkOutcome::Created { url } => xml_response(&format!("Saved task\n{url}")),
        SinkOutcome::Failed { reason } => {
            warn!(%reason, "webhook capture failed");
            xml_response(SINK_FAILURE_REPLY)
        }
    }
}

/// Build the webhook router over shared application state.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/whatsapp", post(whatsapp_reply))
        .route("/health", get(health))
        .with_state(state)
}

/// Serve the webhook listener until cancelled.
///
/// # Errors
///
/// Returns `AppError::Http` if the listener fails to bind or serve.
pub async fn serve(state: Arc<AppState>, ct: CancellationToken) -> Result<()> {
    let bind = SocketAddr::from(([0, 0, 0, 0], state.config.webhook.port));
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Http(format!("failed to bind webhook on {bind}: {err}")))?;

    info!(%bind, "webhook listener started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Http(format!("webhook server error: {err}")))?;

    info!("webhook listener shut down");
    Ok(())
}

fn xml_response(message: &str) -> Response {
    (
        [(header::CONTENT_TYPE, "application/xml")],
        twiml_reply(message),
    )
        .into_response()
}

/// Render a one-message TwiML reply with the content XML-escaped.
#[must_use]
pub fn twiml_reply(message: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        escape_xml(message)
    )
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
