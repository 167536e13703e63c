use task_funnel::models::inbound::{gmail_deep_link, InboundItem, WHATSAPP_SOURCE_LINK};

fn email(subject: &str, body: &str, message_id: Option<&str>) -> InboundItem {
    InboundItem::Email {
        subject: subject.into(),
        body: body.into(),
        message_id: message_id.map(Into::into),
        folder: "NotesTracker".into(),
    }
}

#[test]
fn email_raw_text_combines_subject_and_body() {
    let item = email("Server down", "prod is down", None);
    assert_eq!(item.raw_text(), "Server down\n\nprod is down");
}

#[test]
fn email_with_empty_body_uses_subject_only() {
    let item = email("Server down", "", None);
    assert_eq!(item.raw_text(), "Server down");
}

#[test]
fn email_deep_link_escapes_message_id() {
    let item = email("x", "y", Some("abc+1@mail.example"));
    assert_eq!(
        item.source_link(),
        "https://mail.google.com/mail/u/0/#search/rfc822msgid:abc%2B1%40mail.example"
    );
}

#[test]
fn email_without_message_id_falls_back_to_inbox_link() {
    let item = email("x", "y", None);
    assert_eq!(item.source_link(), "https://mail.google.com/mail/u/0/#inbox");
}

#[test]
fn blank_message_id_falls_back_to_inbox_link() {
    assert_eq!(
        gmail_deep_link(Some("   ")),
        "https://mail.google.com/mail/u/0/#inbox"
    );
}

#[test]
fn slash_command_links_back_to_channel() {
    let item = InboundItem::SlashCommand {
        text: "ship the report".into(),
        channel_id: "C042".into(),
    };
    assert_eq!(item.raw_text(), "ship the report");
    assert_eq!(
        item.source_link(),
        "https://slack.com/app_redirect?channel=C042"
    );
}

#[test]
fn whatsapp_uses_fixed_channel_link() {
    let item = InboundItem::WhatsApp {
        text: "buy milk".into(),
        sender: "whatsapp:+15551234567".into(),
    };
    assert_eq!(item.raw_text(), "buy milk");
    assert_eq!(item.source_link(), WHATSAPP_SOURCE_LINK);
    // The fixed link must survive the sink's http-scheme filter.
    assert!(item.source_link().starts_with("http"));
}
