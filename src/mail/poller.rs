//! Background polling loop over the watched IMAP folder.
//!
//! The mailbox is the queue: every cycle rescans the folder in full, and
//! a message is copied to the inbox, flagged `\Deleted`, and expunged
//! only after its task page was created. Failed messages stay put and
//! are retried by the next cycle's rescan. A crash between page create
//! and expunge reprocesses the message on restart (at-least-once).

use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use native_tls::TlsStream;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::MailConfig;
use crate::mail::message::{self, MailItem};
use crate::models::inbound::InboundItem;
use crate::pipeline::{self, AppState};
use crate::sink::SinkOutcome;
use crate::{AppError, Result};

type ImapSession = imap::Session<TlsStream<TcpStream>>;

/// Run the ingestion loop until cancelled.
///
/// Each cycle is independent: any failure is logged and the loop sleeps
/// into the next cycle. The loop never terminates on a single message's
/// or a single connection's failure.
pub async fn run(state: Arc<AppState>, ct: CancellationToken) {
    let interval = Duration::from_secs(state.config.mail.poll_interval_seconds);
    info!(
        folder = %state.config.mail.folder,
        interval_seconds = state.config.mail.poll_interval_seconds,
        "mail poller started"
    );

    loop {
        tokio::select! {
            () = ct.cancelled() => break,
            () = sleep(interval) => {}
        }

        match poll_cycle(&state).await {
            Ok(0) => {}
            Ok(count) => info!(count, "mail cycle captured tasks"),
            Err(err) => warn!(%err, "mail cycle failed; will retry next interval"),
        }
    }

    info!("mail poller stopped");
}

/// One full cycle: fetch everything, capture each message, then remove
/// the successes from the watched folder.
async fn poll_cycle(state: &AppState) -> Result<usize> {
    let fetch_config = state.config.mail.clone();
    let items = tokio::task::spawn_blocking(move || fetch_pending(&fetch_config))
        .await
        .map_err(|err| AppError::Mail(format!("fetch task panicked: {err}")))??;

    if items.is_empty() {
        return Ok(0);
    }

    let captured = capture_batch(state, &items).await;

    let count = captured.len();
    if !captured.is_empty() {
        let finalize_config = state.config.mail.clone();
        tokio::task::spawn_blocking(move || finalize(&finalize_config, &captured))
            .await
            .map_err(|err| AppError::Mail(format!("finalize task panicked: {err}")))??;
    }

    Ok(count)
}

/// Run the capture step for a batch of fetched messages, returning the
/// UIDs whose task page was created. Only those may be removed from the
/// watched folder; failed captures are left out so their messages stay
/// put for the next cycle's rescan.
pub async fn capture_batch(state: &AppState, items: &[MailItem]) -> Vec<u32> {
    let mut captured = Vec::new();
    for item in items {
        let inbound = InboundItem::Email {
            subject: item.subject.clone(),
            body: message::truncate_chars(&item.body, state.config.mail.body_limit),
            message_id: item.message_id.clone(),
            folder: state.config.mail.folder.clone(),
        };
        match pipeline::capture(state, &inbound).await {
            SinkOutcome::Created { url } => {
                info!(uid = item.uid, %url, subject = %item.subject, "email captured");
                captured.push(item.uid);
            }
            SinkOutcome::Failed { reason } => {
                // Not deleted: the next cycle's rescan is the retry.
                warn!(uid = item.uid, %reason, "email capture failed; message left in folder");
            }
        }
    }
    captured
}

fn open_session(config: &MailConfig) -> Result<ImapSession> {
    let tls = native_tls::TlsConnector::builder()
        .build()
        .map_err(|err| AppError::Mail(format!("tls setup failed: {err}")))?;
    let client = imap::connect(
        (config.server.as_str(), config.port),
        config.server.as_str(),
        &tls,
    )
    .map_err(|err| {
        AppError::Mail(format!(
            "connect to {}:{} failed: {err}",
            config.server, config.port
        ))
    })?;
    client
        .login(&config.user, &config.password)
        .map_err(|(err, _)| AppError::Mail(format!("login failed: {err}")))
}

/// List and parse every message currently in the watched folder,
/// ascending UID order. Unparseable messages are skipped with a log.
fn fetch_pending(config: &MailConfig) -> Result<Vec<MailItem>> {
    let mut session = open_session(config)?;
    session.select(&config.folder).map_err(|err| {
        AppError::Mail(format!("cannot select folder {}: {err}", config.folder))
    })?;

    let uids = session
        .uid_search("ALL")
        .map_err(|err| AppError::Mail(format!("uid search failed: {err}")))?;
    let mut ordered: Vec<u32> = uids.into_iter().collect();
    ordered.sort_unstable();

    let mut items = Vec::with_capacity(ordered.len());
    for uid in ordered {
        let fetches = session
            .uid_fetch(uid.to_string(), "RFC822")
            .map_err(|err| AppError::Mail(format!("fetch of uid {uid} failed: {err}")))?;
        for fetch in fetches.iter() {
            if let Some(raw) = fetch.body() {
                match message::parse_message(uid, raw) {
                    Ok(item) => items.push(item),
                    Err(err) => warn!(uid, %err, "skipping unparseable message"),
                }
            }
        }
    }

    let _ = session.logout();
    Ok(items)
}

/// Copy captured messages to the inbox (when configured), flag them
/// deleted, and expunge. Runs in its own session so a long capture pass
/// does not hold an IMAP connection open.
///
/// Failures are isolated per UID: one bad copy or store does not abort
/// the batch, so the other already-persisted messages are still removed
/// instead of being re-created by the next rescan.
fn finalize(config: &MailConfig, uids: &[u32]) -> Result<()> {
    let mut session = open_session(config)?;
    session.select(&config.folder).map_err(|err| {
        AppError::Mail(format!("cannot select folder {}: {err}", config.folder))
    })?;

    for uid in uids {
        if config.recopy_to_inbox {
            if let Err(err) = session.uid_copy(uid.to_string(), &config.inbox_folder) {
                // Without the copy the message must not be deleted.
                warn!(uid, %err, "copy failed; message kept for the next cycle");
                continue;
            }
        }
        if let Err(err) = session.uid_store(uid.to_string(), "+FLAGS (\\Deleted)") {
            warn!(uid, %err, "delete flag failed; message will be reprocessed");
        }
    }

    session
        .expunge()
        .map_err(|err| AppError::Mail(format!("expunge failed: {err}")))?;
    let _ = session.close();
    let _ = session.logout();
    Ok(())
}
