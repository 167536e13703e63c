//! RFC822 message parsing for the ingestion loop.

use mailparse::{MailHeaderMap, ParsedMail};

use crate::{AppError, Result};

/// Subject prefixes stripped before the subject becomes task material.
const STRIP_PREFIXES: [&str; 3] = ["fwd:", "fw:", "re:"];

/// One message lifted out of the watched folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailItem {
    /// Provider-native UID within the selected folder.
    pub uid: u32,
    /// Decoded subject with forwarding/reply prefixes stripped.
    pub subject: String,
    /// First plain-text body segment, untruncated.
    pub body: String,
    /// Message-ID header value without angle brackets.
    pub message_id: Option<String>,
}

/// Parse a raw RFC822 message into a [`MailItem`].
///
/// Subject charsets (RFC 2047) are decoded by the parser; the body is
/// the first `text/plain` leaf of a multipart tree, or the single
/// payload of a non-multipart message.
///
/// # Errors
///
/// Returns `AppError::Mail` when the bytes are not a parseable message.
pub fn parse_message(uid: u32, raw: &[u8]) -> Result<MailItem> {
    let mail = mailparse::parse_mail(raw)
        .map_err(|err| AppError::Mail(format!("unparseable message {uid}: {err}")))?;

    let subject = clean_subject(&mail.headers.get_first_value("Subject").unwrap_or_default());
    let message_id = mail
        .headers
        .get_first_value("Message-ID")
        .map(|id| id.trim().trim_matches(['<', '>']).to_owned())
        .filter(|id| !id.is_empty());
    let body = first_text_part(&mail).unwrap_or_default().trim().to_owned();

    Ok(MailItem {
        uid,
        subject,
        body,
        message_id,
    })
}

/// Strip forwarding/reply prefixes (`Fwd:`, `FW:`, `Re:`) from a decoded
/// subject, repeatedly and case-insensitively, then trim.
#[must_use]
pub fn clean_subject(raw: &str) -> String {
    let mut subject = raw.trim();
    'strip: loop {
        for prefix in STRIP_PREFIXES {
            if let Some(head) = subject.get(..prefix.len()) {
                if head.eq_ignore_ascii_case(prefix) {
                    subject = subject[prefix.len()..].trim_start();
                    continue 'strip;
                }
            }
        }
        break;
    }
    subject.to_owned()
}

/// Extract the first plain-text body segment.
///
/// Walks a multipart tree looking for the first `text/plain` leaf;
/// non-multipart messages yield their single payload regardless of
/// content type.
#[must_use]
pub fn first_text_part(mail: &ParsedMail<'_>) -> Option<String> {
    if mail.subparts.is_empty() {
        return mail.get_body().ok();
    }
    find_plain_leaf(mail)
}

fn find_plain_leaf(mail: &ParsedMail<'_>) -> Option<String> {
    if mail.subparts.is_empty() {
        if mail.ctype.mimetype.eq_ignore_ascii_case("text/plain") {
            return mail.get_body().ok();
        }
        return None;
    }
    mail.subparts.iter().find_map(find_plain_leaf)
}

/// Truncate to at most `limit` characters without splitting a code point.
#[must_use]
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((index, _)) => text[..index].to_owned(),
        None => text.to_owned(),
    }
}
