//! Provider adapters: inbound webhook parsing and outbound delivery.

pub mod n8n;
pub mod whatsapp;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::ChannelError;
use crate::flow::{PromptSpec, Reply};

pub use n8n::N8nSender;
pub use whatsapp::{AllowList, InboundEvent, normalize_sender, parse_webhook};

/// Outcome of one delivery request, as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub status_code: u16,
    pub response_text: String,
}

impl DeliveryReport {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Outbound side of a chat provider.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Send a plain text message.
    async fn send_text(&self, to: &str, text: &str) -> Result<DeliveryReport, ChannelError>;

    /// Send an interactive multi-option prompt.
    async fn send_prompt(
        &self,
        to: &str,
        prompt: &PromptSpec,
    ) -> Result<DeliveryReport, ChannelError>;
}

/// Deliver an engine reply: the text first (if any), then the prompt (if any).
///
/// Failures are logged and otherwise ignored; the engine has already moved on.
/// Returns how many messages the provider accepted.
pub async fn deliver(sender: &dyn MessageSender, to: &str, reply: &Reply) -> usize {
    let mut delivered = 0;

    if !reply.text.is_empty() {
        let result = sender.send_text(to, &reply.text).await;
        delivered += usize::from(log_delivery(sender.name(), to, "text", result));
    }

    if let Some(prompt) = &reply.prompt {
        let result = sender.send_prompt(to, prompt).await;
        delivered += usize::from(log_delivery(sender.name(), to, "prompt", result));
    }

    delivered
}

fn log_delivery(
    channel: &str,
    to: &str,
    kind: &str,
    result: Result<DeliveryReport, ChannelError>,
) -> bool {
    match result {
        Ok(report) if report.is_success() => {
            info!(channel, to = %to, kind, status = report.status_code, "Message delivered");
            true
        }
        Ok(report) => {
            warn!(
                channel,
                to = %to,
                kind,
                status = report.status_code,
                response = %report.response_text,
                "Provider rejected message"
            );
            false
        }
        Err(e) => {
            warn!(channel, to = %to, kind, error = %e, "Message delivery failed");
            false
        }
    }
}
