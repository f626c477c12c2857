//! n8n relay channel — posts outbound messages to an n8n webhook that
//! forwards them to the WhatsApp Business API.

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::channels::{DeliveryReport, MessageSender};
use crate::error::ChannelError;
use crate::flow::{PromptSpec, PromptStyle};

/// WhatsApp caps reply buttons at three.
const MAX_REPLY_BUTTONS: usize = 3;
/// WhatsApp caps button and row titles at 20/24 characters.
const MAX_BUTTON_TITLE_CHARS: usize = 20;
const MAX_ROW_TITLE_CHARS: usize = 24;

/// Outbound sender that talks to the n8n relay webhook.
pub struct N8nSender {
    webhook_url: String,
    client: reqwest::Client,
}

impl N8nSender {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Use a preconfigured HTTP client (timeouts, proxy settings).
    pub fn with_client(webhook_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            client,
        }
    }

    async fn post(&self, to: &str, body: &Value) -> Result<DeliveryReport, ChannelError> {
        tracing::debug!(to = %to, url = %self.webhook_url, payload = %body, "Posting to n8n");

        let resp = self
            .client
            .post(&self.webhook_url)
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                name: "n8n".into(),
                reason: e.to_string(),
            })?;

        let status_code = resp.status().as_u16();
        let response_text = resp.text().await?;
        Ok(DeliveryReport {
            status_code,
            response_text,
        })
    }
}

#[async_trait]
impl MessageSender for N8nSender {
    fn name(&self) -> &str {
        "n8n"
    }

    async fn send_text(&self, to: &str, text: &str) -> Result<DeliveryReport, ChannelError> {
        self.post(to, &text_payload(to, text)).await
    }

    async fn send_prompt(
        &self,
        to: &str,
        prompt: &PromptSpec,
    ) -> Result<DeliveryReport, ChannelError> {
        self.post(to, &prompt_payload(to, prompt)).await
    }
}

/// `{"to", "text"}` — the relay's plain message shape.
pub fn text_payload(to: &str, text: &str) -> Value {
    json!({
        "to": to,
        "text": text,
    })
}

/// Interactive message in WhatsApp Cloud API form, addressed for the relay.
///
/// Buttons beyond the provider's limit fall back to a list.
pub fn prompt_payload(to: &str, prompt: &PromptSpec) -> Value {
    let as_buttons =
        prompt.style == PromptStyle::Buttons && prompt.options.len() <= MAX_REPLY_BUTTONS;

    let interactive = if as_buttons {
        let buttons: Vec<Value> = prompt
            .options
            .iter()
            .map(|o| {
                json!({
                    "type": "reply",
                    "reply": {"id": o.id, "title": truncate(&o.title, MAX_BUTTON_TITLE_CHARS)},
                })
            })
            .collect();
        json!({
            "type": "button",
            "body": {"text": prompt.body_text},
            "action": {"buttons": buttons},
        })
    } else {
        let rows: Vec<Value> = prompt
            .options
            .iter()
            .map(|o| json!({"id": o.id, "title": truncate(&o.title, MAX_ROW_TITLE_CHARS)}))
            .collect();
        json!({
            "type": "list",
            "body": {"text": prompt.body_text},
            "action": {
                "button": truncate(&prompt.button_text, MAX_BUTTON_TITLE_CHARS),
                "sections": [{
                    "title": truncate(&prompt.button_text, MAX_ROW_TITLE_CHARS),
                    "rows": rows,
                }],
            },
        })
    };

    json!({
        "to": to,
        "type": "interactive",
        "interactive": interactive,
    })
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
