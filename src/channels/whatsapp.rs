//! WhatsApp inbound adapter — turns webhook payloads into engine input.
//!
//! Payloads arrive either as a raw WhatsApp Business webhook (`{"entry": ...}`),
//! wrapped by the n8n relay (`{"body": {"entry": ...}}`), or in a flat
//! `{"from": ..., "text": ...}` shape used for manual testing.

use serde::Deserialize;

use crate::flow::InboundMessage;

// ── Webhook JSON ────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WebhookPayload {
    body: Option<BusinessPayload>,
    entry: Vec<Entry>,
    // Flat shape
    from: Option<String>,
    phone_number: Option<String>,
    phone: Option<String>,
    sender: Option<String>,
    text: Option<String>,
    choice_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BusinessPayload {
    entry: Vec<Entry>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Entry {
    changes: Vec<Change>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Change {
    value: ChangeValue,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ChangeValue {
    messages: Vec<WaMessage>,
    statuses: Vec<WaStatus>,
    contacts: Vec<WaContact>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaMessage {
    from: Option<String>,
    text: Option<WaText>,
    interactive: Option<WaInteractive>,
    button: Option<WaButton>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaText {
    body: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaInteractive {
    button_reply: Option<WaReply>,
    list_reply: Option<WaReply>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaReply {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaButton {
    payload: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaStatus {
    recipient_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct WaContact {
    wa_id: Option<String>,
}

// ── Parsed events ───────────────────────────────────────────────────────

/// What an inbound webhook call carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A user message. `sender` is the raw id as the provider sent it.
    Message {
        sender: String,
        message: InboundMessage,
    },
    /// Delivery/read receipt or other event without user content.
    StatusUpdate { sender: String },
    /// No sender could be found.
    Unrecognized,
}

/// Parse any supported webhook shape.
pub fn parse_webhook(payload: &serde_json::Value) -> InboundEvent {
    let parsed = match WebhookPayload::deserialize(payload) {
        Ok(p) => p,
        Err(e) => {
            tracing::debug!(error = %e, "Webhook payload does not match any known shape");
            return InboundEvent::Unrecognized;
        }
    };

    let value = parsed
        .body
        .as_ref()
        .map(|b| b.entry.as_slice())
        .filter(|entries| !entries.is_empty())
        .unwrap_or(parsed.entry.as_slice())
        .first()
        .and_then(|entry| entry.changes.first())
        .map(|change| &change.value);

    let first_message = value.and_then(|v| v.messages.first());

    let sender = first_message
        .and_then(|m| m.from.clone())
        .or_else(|| value.and_then(|v| v.statuses.first()?.recipient_id.clone()))
        .or_else(|| value.and_then(|v| v.contacts.first()?.wa_id.clone()))
        .filter(|s| !s.trim().is_empty())
        .or_else(|| {
            [&parsed.from, &parsed.phone_number, &parsed.phone, &parsed.sender]
                .into_iter()
                .flatten()
                .find(|s| !s.trim().is_empty())
                .cloned()
        });

    let Some(sender) = sender else {
        return InboundEvent::Unrecognized;
    };

    let message = match first_message {
        Some(m) => Some(message_from_business(m)),
        None => message_from_flat(&parsed),
    };

    match message {
        Some(message) => InboundEvent::Message { sender, message },
        None => InboundEvent::StatusUpdate { sender },
    }
}

fn message_from_business(message: &WaMessage) -> InboundMessage {
    let selection = message
        .interactive
        .as_ref()
        .and_then(|i| i.button_reply.as_ref().or(i.list_reply.as_ref()))
        .map(|reply| reply.id.clone())
        .or_else(|| message.button.as_ref().map(|b| b.payload.clone()))
        .filter(|id| !id.is_empty());

    match selection {
        Some(id) => InboundMessage::selection(id),
        // Media and other message types carry no text
        None => {
            let body = message.text.as_ref().map(|t| t.body.clone());
            InboundMessage::text(body.unwrap_or_default())
        }
    }
}

fn message_from_flat(payload: &WebhookPayload) -> Option<InboundMessage> {
    if let Some(id) = payload.choice_id.as_ref().filter(|id| !id.is_empty()) {
        return Some(InboundMessage::selection(id.clone()));
    }
    payload.text.as_ref().map(|text| InboundMessage::text(text.clone()))
}

// ── Sender ids ──────────────────────────────────────────────────────────

/// Canonical sender id: spaces, dashes and `+` removed.
pub fn normalize_sender(raw: &str) -> String {
    raw.chars().filter(|c| !matches!(c, ' ' | '-' | '+')).collect()
}

/// Senders the bot is willing to talk to.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    entries: Vec<String>,
}

impl AllowList {
    /// `*` allows everyone; an empty list denies everyone.
    pub fn new(entries: Vec<String>) -> Self {
        Self { entries }
    }

    /// Allowed if either the raw or the normalized form is listed.
    pub fn is_allowed(&self, raw: &str, normalized: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e == "*" || e == raw || e == normalized || normalize_sender(e) == normalized)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn business(message: serde_json::Value) -> serde_json::Value {
        json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "id": "1",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "contacts": [{"profile": {"name": "Dana"}, "wa_id": "972500000000"}],
                        "messages": [message]
                    }
                }]
            }]
        })
    }

    #[test]
    fn parses_text_message() {
        let payload = business(json!({
            "from": "972500000000",
            "id": "wamid.1",
            "type": "text",
            "text": {"body": "Q3 Plan"}
        }));
        assert_eq!(
            parse_webhook(&payload),
            InboundEvent::Message {
                sender: "972500000000".into(),
                message: InboundMessage::text("Q3 Plan"),
            }
        );
    }

    #[test]
    fn parses_button_reply_as_selection() {
        let payload = business(json!({
            "from": "972500000000",
            "type": "interactive",
            "interactive": {
                "type": "button_reply",
                "button_reply": {"id": "proposal_new", "title": "מצע חדש"}
            }
        }));
        let InboundEvent::Message { message, .. } = parse_webhook(&payload) else {
            panic!("expected message");
        };
        assert_eq!(message, InboundMessage::selection("proposal_new"));
    }

    #[test]
    fn parses_list_reply_and_template_button() {
        let list = business(json!({
            "from": "1",
            "type": "interactive",
            "interactive": {"type": "list_reply", "list_reply": {"id": "new_task", "title": "x"}}
        }));
        let button = business(json!({
            "from": "1",
            "type": "button",
            "button": {"payload": "proposal_for_discussion", "text": "x"}
        }));
        let new_task = InboundMessage::selection("new_task");
        assert!(matches!(
            parse_webhook(&list),
            InboundEvent::Message { message, .. } if message == new_task
        ));
        assert!(matches!(
            parse_webhook(&button),
            InboundEvent::Message { message, .. }
                if message == InboundMessage::selection("proposal_for_discussion")
        ));
    }

    #[test]
    fn unwraps_relay_body() {
        let payload = json!({ "body": business(json!({
            "from": "972500000000",
            "type": "text",
            "text": {"body": "hi"}
        })) });
        assert!(matches!(
            parse_webhook(&payload),
            InboundEvent::Message { sender, .. } if sender == "972500000000"
        ));
    }

    #[test]
    fn status_update_is_not_a_message() {
        let payload = json!({"entry": [{"changes": [{"value": {
            "statuses": [{"id": "wamid.1", "status": "read", "recipient_id": "972500000000"}]
        }}]}]});
        assert_eq!(
            parse_webhook(&payload),
            InboundEvent::StatusUpdate {
                sender: "972500000000".into()
            }
        );
    }

    #[test]
    fn media_message_becomes_empty_text() {
        let payload = business(json!({"from": "1", "type": "image", "image": {"id": "m"}}));
        assert!(matches!(
            parse_webhook(&payload),
            InboundEvent::Message { message, .. } if message == InboundMessage::text("")
        ));
    }

    #[test]
    fn flat_shape() {
        assert_eq!(
            parse_webhook(&json!({"phone": "+972 50-000-0000", "text": "hello"})),
            InboundEvent::Message {
                sender: "+972 50-000-0000".into(),
                message: InboundMessage::text("hello"),
            }
        );
        assert_eq!(
            parse_webhook(&json!({"sender": "1", "choice_id": "new_task"})),
            InboundEvent::Message {
                sender: "1".into(),
                message: InboundMessage::selection("new_task"),
            }
        );
        assert_eq!(
            parse_webhook(&json!({"from": "1"})),
            InboundEvent::StatusUpdate { sender: "1".into() }
        );
    }

    #[test]
    fn unrecognized_payloads() {
        assert_eq!(parse_webhook(&json!({})), InboundEvent::Unrecognized);
        assert_eq!(parse_webhook(&json!({"text": "no sender"})), InboundEvent::Unrecognized);
        assert_eq!(parse_webhook(&json!([1, 2, 3])), InboundEvent::Unrecognized);
        assert_eq!(parse_webhook(&json!({"entry": "oops"})), InboundEvent::Unrecognized);
    }

    #[test]
    fn normalize_strips_separators() {
        assert_eq!(normalize_sender("+972 54-220-2468"), "972542202468");
        assert_eq!(normalize_sender("972542202468"), "972542202468");
        assert_eq!(normalize_sender(""), "");
    }

    #[test]
    fn allow_list_matching() {
        let list = AllowList::new(vec!["972542202468".into()]);
        assert!(list.is_allowed("+972 54-220-2468", "972542202468"));
        assert!(list.is_allowed("972542202468", "972542202468"));
        assert!(!list.is_allowed("972500000000", "972500000000"));

        let formatted = AllowList::new(vec!["+972-54-220-2468".into()]);
        assert!(formatted.is_allowed("972542202468", "972542202468"));

        let everyone = AllowList::new(vec!["*".into()]);
        assert!(everyone.is_allowed("anyone", "anyone"));

        let nobody = AllowList::default();
        assert!(!nobody.is_allowed("972542202468", "972542202468"));
    }
}
