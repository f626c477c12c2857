//! HTTP surface — WhatsApp webhook, manual send, health and info endpoints.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::channels::{self, AllowList, InboundEvent, MessageSender};
use crate::config::BotConfig;
use crate::flow::FlowEngine;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<FlowEngine>,
    /// Outbound delivery for engine replies.
    pub sender: Arc<dyn MessageSender>,
    pub allow_list: AllowList,
    pub config: Arc<BotConfig>,
}

impl AppState {
    pub fn new(engine: Arc<FlowEngine>, sender: Arc<dyn MessageSender>, config: BotConfig) -> Self {
        Self {
            engine,
            sender,
            allow_list: AllowList::new(config.allowed_senders.clone()),
            config: Arc::new(config),
        }
    }
}

/// Build the Axum router.
pub fn bot_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/info", get(info_handler))
        .route("/whatsapp/get_message", post(get_message))
        .route("/whatsapp/send_message", post(send_message))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the router on an already-bound listener until the process exits.
pub async fn serve(listener: TcpListener, state: AppState) -> crate::error::Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, environment = %state.config.environment, "Flow Bot listening");
    axum::serve(listener, bot_routes(state)).await?;
    Ok(())
}

// ── Status ──────────────────────────────────────────────────────────────

async fn root() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "message": "WhatsApp Bot is running"
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "environment": state.config.environment.to_string(),
    }))
}

async fn info_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "environment": state.config.environment.to_string(),
        "n8n_webhook_url": state.config.webhook_url,
        "active_sessions": state.engine.store().len(),
    }))
}

// ── Webhook ─────────────────────────────────────────────────────────────

/// POST /whatsapp/get_message
///
/// Always answers `{"status": "ok"}` so the provider does not retry;
/// `handled` tells whether the flow engine ran.
async fn get_message(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "Webhook body is not JSON");
            return Json(json!({"status": "ok", "handled": false}));
        }
    };
    debug!(%payload, "Incoming WhatsApp webhook");

    let handled = match channels::parse_webhook(&payload) {
        InboundEvent::Message { sender, message } => {
            let normalized = channels::normalize_sender(&sender);
            if state.allow_list.is_allowed(&sender, &normalized) {
                let reply = state.engine.process_message(&normalized, &message);
                if !reply.is_empty() {
                    channels::deliver(state.sender.as_ref(), &normalized, &reply).await;
                }
                true
            } else {
                debug!(sender = %normalized, "Sender not in allow-list, ignoring");
                false
            }
        }
        InboundEvent::StatusUpdate { sender } => {
            debug!(sender = %sender, "Status update, skipping");
            false
        }
        InboundEvent::Unrecognized => {
            debug!("No sender found in webhook payload");
            false
        }
    };

    Json(json!({"status": "ok", "handled": handled}))
}

/// POST /whatsapp/send_message
///
/// Sends the configured test text to the configured test recipient.
async fn send_message(State(state): State<AppState>) -> impl IntoResponse {
    let config = &state.config;
    let result = state
        .sender
        .send_text(&config.test_recipient, &config.test_text)
        .await;

    let (status, n8n_status, n8n_response) = match result {
        Ok(report) => {
            let status = if report.is_success() { "sent" } else { "error" };
            (status, Some(report.status_code), Some(report.response_text))
        }
        Err(e) => {
            warn!(error = %e, "Manual send failed");
            ("error", None, Some(e.to_string()))
        }
    };

    Json(json!({
        "status": status,
        "environment": config.environment.to_string(),
        "n8n_webhook_url": config.webhook_url,
        "n8n_status": n8n_status,
        "n8n_response": n8n_response,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::channels::DeliveryReport;
    use crate::error::ChannelError;
    use crate::flow::{FlowState, InMemorySessionStore, PromptSpec};

    #[derive(Default)]
    struct StubSender {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl MessageSender for StubSender {
        fn name(&self) -> &str {
            "stub"
        }

        async fn send_text(&self, to: &str, text: &str) -> Result<DeliveryReport, ChannelError> {
            self.sent.lock().unwrap().push((to.to_string(), text.to_string()));
            Ok(DeliveryReport {
                status_code: 200,
                response_text: "Workflow was started".into(),
            })
        }

        async fn send_prompt(
            &self,
            to: &str,
            prompt: &PromptSpec,
        ) -> Result<DeliveryReport, ChannelError> {
            self.sent.lock().unwrap().push((to.to_string(), format!("<{}>", prompt.body_text)));
            Ok(DeliveryReport {
                status_code: 200,
                response_text: String::new(),
            })
        }
    }

    fn test_state() -> (AppState, Arc<StubSender>) {
        let sender = Arc::new(StubSender::default());
        let engine = Arc::new(FlowEngine::new(InMemorySessionStore::new()));
        let state = AppState::new(engine, sender.clone(), BotConfig::default());
        (state, sender)
    }

    async fn call(app: Router, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn root_and_health() {
        let (state, _) = test_state();
        let (status, json) = call(bot_routes(state.clone()), "GET", "/", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");

        let (_, json) = call(bot_routes(state), "GET", "/health", "").await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["environment"], "test");
    }

    #[tokio::test]
    async fn info_reports_webhook_and_sessions() {
        let (state, _) = test_state();
        state.engine.store().set("972542202468", FlowState::ProposalChoice);
        let (_, json) = call(bot_routes(state), "GET", "/info", "").await;
        assert_eq!(json["n8n_webhook_url"], crate::config::TEST_WEBHOOK_URL);
        assert_eq!(json["active_sessions"], 1);
    }

    #[tokio::test]
    async fn allowed_sender_is_answered_with_normalized_id() {
        let (state, sender) = test_state();
        let body = r#"{"from": "+972 54-220-2468", "text": "hello"}"#;
        let (status, json) = call(bot_routes(state), "POST", "/whatsapp/get_message", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["handled"], true);
        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "972542202468");
        assert!(sent[0].1.starts_with('<'), "menu prompt expected, got {:?}", sent[0]);
    }

    #[tokio::test]
    async fn unknown_sender_is_ignored() {
        let (state, sender) = test_state();
        let body = r#"{"from": "972500000000", "text": "hello"}"#;
        let app = bot_routes(state.clone());
        let (_, json) = call(app, "POST", "/whatsapp/get_message", body).await;

        assert_eq!(json["handled"], false);
        assert!(sender.sent.lock().unwrap().is_empty());
        assert!(state.engine.store().is_empty());
    }

    #[tokio::test]
    async fn malformed_body_still_ok() {
        let (state, _) = test_state();
        let app = bot_routes(state);
        let (status, json) = call(app, "POST", "/whatsapp/get_message", "not json").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["handled"], false);
    }

    #[tokio::test]
    async fn manual_send_reports_relay_status() {
        let (state, sender) = test_state();
        let (_, json) = call(bot_routes(state), "POST", "/whatsapp/send_message", "").await;
        assert_eq!(json["status"], "sent");
        assert_eq!(json["n8n_status"], 200);
        assert_eq!(json["n8n_response"], "Workflow was started");
        let sent = sender.sent.lock().unwrap();
        assert_eq!(sent[0].0, "972542202468");
        assert_eq!(sent[0].1, crate::config::DEFAULT_TEST_TEXT);
    }
}
