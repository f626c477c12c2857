//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Relay webhook that forwards outbound messages to WhatsApp (production).
pub const PROD_WEBHOOK_URL: &str = "https://ninsights.app.n8n.cloud/webhook/whatsappout";
/// Relay webhook used outside production.
pub const TEST_WEBHOOK_URL: &str = "https://ninsights.app.n8n.cloud/webhook-test/whatsappout";

/// Sender allowed by default when no allow-list is configured.
pub const DEFAULT_ALLOWED_SENDER: &str = "972542202468";
/// Text sent by the manual send endpoint.
pub const DEFAULT_TEST_TEXT: &str = "הודעה ישירות דרך n8n";

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Prod,
    Test,
}

impl Environment {
    /// `prod` (any case, surrounding whitespace ignored) is production;
    /// everything else, including unset, is test.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()) {
            Some(s) if s == "prod" => Self::Prod,
            _ => Self::Test,
        }
    }

    pub fn default_webhook_url(&self) -> &'static str {
        match self {
            Self::Prod => PROD_WEBHOOK_URL,
            Self::Test => TEST_WEBHOOK_URL,
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Prod => write!(f, "prod"),
            Self::Test => write!(f, "test"),
        }
    }
}

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub environment: Environment,
    /// Where outbound messages are posted.
    pub webhook_url: String,
    /// HTTP listen port.
    pub port: u16,
    /// Senders the flow engine answers. `*` allows everyone.
    pub allowed_senders: Vec<String>,
    /// Recipient of the manual send endpoint.
    pub test_recipient: String,
    pub test_text: String,
    /// Sessions untouched this long are dropped. `None` keeps them forever.
    pub session_idle_timeout: Option<Duration>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Test,
            webhook_url: TEST_WEBHOOK_URL.to_string(),
            port: 8000,
            allowed_senders: vec![DEFAULT_ALLOWED_SENDER.to_string()],
            test_recipient: DEFAULT_ALLOWED_SENDER.to_string(),
            test_text: DEFAULT_TEST_TEXT.to_string(),
            session_idle_timeout: Some(Duration::from_secs(3600)), // 1 hour
        }
    }
}

impl BotConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let environment = Environment::parse(lookup("ENVIRONMENT").as_deref());

        let webhook_url = lookup("N8N_WEBHOOK_URL")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| environment.default_webhook_url().to_string());

        let port = match lookup("FLOW_BOT_PORT") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "FLOW_BOT_PORT".to_string(),
                message: format!("{raw:?}: {e}"),
            })?,
            None => defaults.port,
        };

        let allowed_senders = match lookup("FLOW_BOT_ALLOWED_SENDERS") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.allowed_senders,
        };

        let test_recipient = lookup("FLOW_BOT_TEST_RECIPIENT")
            .or_else(|| allowed_senders.iter().find(|s| *s != "*").cloned())
            .unwrap_or(defaults.test_recipient);

        let session_idle_timeout = match lookup("FLOW_BOT_SESSION_IDLE_MINUTES") {
            Some(raw) => {
                let minutes: u64 = raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                    key: "FLOW_BOT_SESSION_IDLE_MINUTES".to_string(),
                    message: format!("{raw:?}: {e}"),
                })?;
                let secs = minutes.checked_mul(60).ok_or_else(|| ConfigError::InvalidValue {
                    key: "FLOW_BOT_SESSION_IDLE_MINUTES".to_string(),
                    message: format!("{raw:?}: too large"),
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => defaults.session_idle_timeout,
        };

        Ok(Self {
            environment,
            webhook_url,
            port,
            allowed_senders,
            test_recipient,
            test_text: defaults.test_text,
            session_idle_timeout,
        })
    }
}
