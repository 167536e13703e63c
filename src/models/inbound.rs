//! Transient channel-specific raw material.
//!
//! An [`InboundItem`] is read once, transformed into exactly one task
//! record, and never persisted as its own entity. Email items are the
//! only ones with source-side state: the message stays in the watched
//! folder until the sink call succeeds.

/// Source link attached to webhook-captured tasks. The webhook carries
/// no per-message deep link, so a fixed channel identifier is used.
pub const WHATSAPP_SOURCE_LINK: &str = "https://web.whatsapp.com/";

/// Fallback link when an email has no usable Message-ID.
const GMAIL_INBOX_LINK: &str = "https://mail.google.com/mail/u/0/#inbox";

/// One raw inbound item from any ingestion channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundItem {
    /// Message fetched from the watched IMAP folder. The body is already
    /// truncated to the configured bound by the time it lands here.
    Email {
        /// Decoded subject with forwarding/reply prefixes stripped.
        subject: String,
        /// First plain-text body segment, truncated.
        body: String,
        /// Provider-native Message-ID without angle brackets.
        message_id: Option<String>,
        /// Folder the message was fetched from.
        folder: String,
    },
    /// Free text from a Slack slash command.
    SlashCommand {
        /// Command argument text.
        text: String,
        /// Invoking channel, used for the redirect link and the reply.
        channel_id: String,
    },
    /// Free text from the inbound message webhook.
    WhatsApp {
        /// Message body.
        text: String,
        /// Sender identifier from the form payload.
        sender: String,
    },
}

impl InboundItem {
    /// Raw text handed to the expansion agent.
    #[must_use]
    pub fn raw_text(&self) -> String {
        match self {
            Self::Email { subject, body, .. } => {
                if body.is_empty() {
                    subject.clone()
                } else {
                    format!("{subject}\n\n{body}")
                }
            }
            Self::SlashCommand { text, .. } | Self::WhatsApp { text, .. } => text.clone(),
        }
    }

    /// Deep link back to the originating item.
    #[must_use]
    pub fn source_link(&self) -> String {
        match self {
            Self::Email { message_id, .. } => gmail_deep_link(message_id.as_deref()),
            Self::SlashCommand { channel_id, .. } => {
                format!("https://slack.com/app_redirect?channel={channel_id}")
            }
            Self::WhatsApp { .. } => WHATSAPP_SOURCE_LINK.into(),
        }
    }
}

/// Build a Gmail deep link from a provider Message-ID.
///
/// The ID is URL-escaped into an `rfc822msgid:` search; messages without
/// an ID fall back to a generic inbox link.
#[must_use]
pub fn gmail_deep_link(message_id: Option<&str>) -> String {
    match message_id {
        Some(id) if !id.trim().is_empty() => format!(
            "https://mail.google.com/mail/u/0/#search/rfc822msgid:{}",
            urlencoding::encode(id.trim())
        ),
        _ => GMAIL_INBOX_LINK.into(),
    }
}
