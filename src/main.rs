use std::sync::Arc;

use flow_bot::channels::{MessageSender, N8nSender};
use flow_bot::config::BotConfig;
use flow_bot::flow::{FlowEngine, InMemorySessionStore, SessionStore, spawn_session_sweep};
use flow_bot::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env()?;

    eprintln!("🤖 Flow Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Environment: {}", config.environment);
    eprintln!("   n8n webhook: {}", config.webhook_url);
    eprintln!("   Webhook: http://0.0.0.0:{}/whatsapp/get_message", config.port);
    eprintln!(
        "   Allowed senders: {}",
        if config.allowed_senders.iter().any(|s| s == "*") {
            "everyone".to_string()
        } else if config.allowed_senders.is_empty() {
            "none (deny all)".to_string()
        } else {
            config.allowed_senders.join(", ")
        }
    );

    // ── Sessions ────────────────────────────────────────────────────────
    let store: Arc<dyn SessionStore> = InMemorySessionStore::new();
    match config.session_idle_timeout {
        Some(idle) => {
            let _sweep_handle = spawn_session_sweep(Arc::clone(&store), idle);
            eprintln!("   Session idle timeout: {} min", idle.as_secs() / 60);
        }
        None => eprintln!("   Session idle timeout: disabled"),
    }

    let engine = Arc::new(FlowEngine::new(store));
    let sender: Arc<dyn MessageSender> = Arc::new(N8nSender::new(config.webhook_url.clone()));

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    eprintln!();

    server::serve(listener, AppState::new(engine, sender, config)).await?;

    Ok(())
}
