//! Session store — per-sender dialogue state and collected answers.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

use super::state::FlowState;

/// How often the idle sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// One sender's position in a flow plus the answers collected so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub state: FlowState,
    /// Flow-specific answers keyed by field name (`name`, `participants`, ...).
    pub data: HashMap<String, String>,
    /// Last time the session was written.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// A fresh `Idle` session with no collected data.
    pub fn idle() -> Self {
        Self {
            state: FlowState::Idle,
            data: HashMap::new(),
            updated_at: Utc::now(),
        }
    }

    /// Look up a collected field.
    pub fn field(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::idle()
    }
}

/// Storage for sessions, keyed by (normalized) sender id.
///
/// Each operation is atomic on its own. Callers that may deliver several
/// messages for the same sender concurrently must serialize them.
pub trait SessionStore: Send + Sync {
    /// Current session, or a fresh `Idle` one if the sender is unknown.
    fn get(&self, sender: &str) -> Session;

    /// Overwrite the state, leaving collected data untouched.
    fn set(&self, sender: &str, state: FlowState);

    /// Upsert one collected field.
    fn set_field(&self, sender: &str, key: &str, value: &str);

    /// Back to `Idle` with an empty data bag, in one step.
    fn reset(&self, sender: &str);

    /// Drop sessions not written since `cutoff`. Returns how many were dropped.
    fn prune_idle(&self, cutoff: DateTime<Utc>) -> usize;

    /// Number of senders with a stored session.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local session store.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn with_session<R>(&self, sender: &str, f: impl FnOnce(&mut Session) -> R) -> R {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.entry(sender.to_string()).or_default();
        let out = f(session);
        session.updated_at = Utc::now();
        out
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, sender: &str) -> Session {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(sender)
            .cloned()
            .unwrap_or_default()
    }

    fn set(&self, sender: &str, state: FlowState) {
        self.with_session(sender, |session| session.state = state);
        debug!(sender = %sender, state = %state, "Session state set");
    }

    fn set_field(&self, sender: &str, key: &str, value: &str) {
        self.with_session(sender, |session| {
            session.data.insert(key.to_string(), value.to_string());
        });
    }

    fn reset(&self, sender: &str) {
        self.with_session(sender, |session| {
            session.state = FlowState::Idle;
            session.data.clear();
        });
        debug!(sender = %sender, "Session reset");
    }

    fn prune_idle(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().unwrap_or_else(PoisonError::into_inner);
        let before = sessions.len();
        sessions.retain(|_, session| session.updated_at >= cutoff);
        before - sessions.len()
    }

    fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Spawn a background task that drops sessions idle for longer than `idle_timeout`.
pub fn spawn_session_sweep(
    store: Arc<dyn SessionStore>,
    idle_timeout: Duration,
) -> tokio::task::JoinHandle<()> {
    let max_idle = TimeDelta::from_std(idle_timeout).unwrap_or(TimeDelta::MAX);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let Some(cutoff) = Utc::now().checked_sub_signed(max_idle) else {
                continue;
            };
            let pruned = store.prune_idle(cutoff);
            if pruned > 0 {
                info!(pruned, remaining = store.len(), "Pruned idle sessions");
            }
        }
    })
}
