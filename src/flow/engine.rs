//! Flow engine — decides, for each inbound message, how the sender's session
//! advances and what to reply.
//!
//! The engine does no I/O. It reads the session, writes the new one back
//! through the [`SessionStore`], and returns a [`Reply`] for the caller to
//! deliver. Every input yields a reply; nothing here fails.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::dialogue::{
    self, PromptSpec, ProposalChoice, ProposalDraft, TopLevelAction, TopLevelChoice,
};
use super::session::{Session, SessionStore};
use super::state::{FlowKind, FlowState, InputKind};

/// A normalized inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Free-form text typed by the sender.
    Text { text: String },
    /// An option picked from the last interactive prompt.
    Selection { selection_id: String },
}

impl InboundMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn selection(id: impl Into<String>) -> Self {
        Self::Selection {
            selection_id: id.into(),
        }
    }

    pub fn kind(&self) -> InputKind {
        match self {
            Self::Text { .. } => InputKind::Text,
            Self::Selection { .. } => InputKind::Selection,
        }
    }
}

/// What to send back. `text` may be empty when only `prompt` should go out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<PromptSpec>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            prompt: None,
        }
    }

    pub fn prompt(prompt: PromptSpec) -> Self {
        Self {
            text: String::new(),
            prompt: Some(prompt),
        }
    }

    /// Whether there is nothing to deliver.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.prompt.is_none()
    }
}

/// Per-sender dialogue state machine over an injected session store.
pub struct FlowEngine {
    store: Arc<dyn SessionStore>,
}

impl FlowEngine {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// The backing store (read-only inspection, e.g. session counts).
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Handle one message from `sender` and return the reply to deliver.
    pub fn process_message(&self, sender: &str, message: &InboundMessage) -> Reply {
        let session = self.store.get(sender);
        debug!(sender = %sender, state = %session.state, message = ?message, "Processing message");

        if session.state != FlowState::Idle {
            if let InboundMessage::Text { text } = message {
                if dialogue::is_cancel_keyword(text) {
                    info!(sender = %sender, state = %session.state, "Flow cancelled");
                    self.store.reset(sender);
                    return Reply::text(dialogue::CANCELLED_REPLY);
                }
            }
        }

        match session.state.flow() {
            None => self.handle_idle(sender, message),
            Some(FlowKind::Proposal) => self.handle_proposal(sender, &session, message),
        }
    }

    fn handle_idle(&self, sender: &str, message: &InboundMessage) -> Reply {
        match message {
            InboundMessage::Selection { selection_id } => {
                self.dispatch_top_level(sender, selection_id)
            }
            // Blank text (media messages too) still gets the menu
            InboundMessage::Text { text } if text.trim().is_empty() => Reply {
                text: dialogue::CHOOSE_OPTION_REPLY.to_string(),
                prompt: Some(dialogue::top_level_prompt()),
            },
            InboundMessage::Text { .. } => Reply::prompt(dialogue::top_level_prompt()),
        }
    }

    /// Route a top-level selection. Also the fallback for selections that
    /// arrive in a state waiting for text.
    fn dispatch_top_level(&self, sender: &str, selection_id: &str) -> Reply {
        let Some(choice) = TopLevelChoice::from_id(selection_id) else {
            debug!(sender = %sender, selection = %selection_id, "Unrecognized top-level selection");
            return Reply::text(dialogue::UNKNOWN_CHOICE_REPLY);
        };

        match choice.action() {
            TopLevelAction::Enter(kind) => self.enter_flow(sender, kind),
            TopLevelAction::Stub(reply) => Reply::text(reply),
        }
    }

    fn enter_flow(&self, sender: &str, kind: FlowKind) -> Reply {
        info!(sender = %sender, flow = ?kind, "Entering flow");
        self.store.reset(sender);
        // Leave Idle before writing data so Idle never carries a bag.
        let reply = match kind {
            FlowKind::Proposal => {
                self.advance(sender, FlowState::Idle, FlowState::ProposalChoice);
                Reply::prompt(dialogue::proposal_choice_prompt())
            }
        };
        self.store
            .set_field(sender, dialogue::fields::TYPE, dialogue::flow_tag(kind));
        reply
    }

    fn handle_proposal(&self, sender: &str, session: &Session, message: &InboundMessage) -> Reply {
        let state = session.state;

        if !state.expects(message.kind()) {
            return match message {
                InboundMessage::Selection { selection_id } => {
                    debug!(
                        sender = %sender,
                        state = %state,
                        selection = %selection_id,
                        "Selection while expecting text, trying top-level dispatch"
                    );
                    self.dispatch_top_level(sender, selection_id)
                }
                InboundMessage::Text { .. } if state == FlowState::ProposalChoice => {
                    Reply::text(dialogue::PROPOSAL_CHOICE_NUDGE)
                }
                InboundMessage::Text { .. } => {
                    warn!(
                        sender = %sender,
                        state = %state,
                        "Session stuck in unexpected state, resetting"
                    );
                    self.store.reset(sender);
                    Reply::prompt(dialogue::top_level_prompt())
                }
            };
        }

        match (state, message) {
            (FlowState::ProposalChoice, InboundMessage::Selection { selection_id }) => {
                match ProposalChoice::from_id(selection_id) {
                    Some(ProposalChoice::New) => {
                        self.advance(sender, state, FlowState::ProposalNewName);
                        Reply::text(dialogue::NAME_QUESTION)
                    }
                    Some(ProposalChoice::Existing) => {
                        self.store.reset(sender);
                        Reply::text(dialogue::EXISTING_PROPOSAL_REPLY)
                    }
                    None => Reply::text(dialogue::PROPOSAL_CHOICE_NUDGE),
                }
            }
            (_, InboundMessage::Text { text }) => self.collect_answer(sender, state, text),
            (_, InboundMessage::Selection { .. }) => {
                // expects() admits selections only in ProposalChoice
                Reply::text(dialogue::UNKNOWN_CHOICE_REPLY)
            }
        }
    }

    /// Store a typed answer and move to the next question, or finish.
    fn collect_answer(&self, sender: &str, state: FlowState, text: &str) -> Reply {
        let Some(field) = dialogue::field_for(state) else {
            self.store.reset(sender);
            return Reply::prompt(dialogue::top_level_prompt());
        };

        if text.trim().is_empty() {
            // Ask again rather than store a blank answer.
            let question = dialogue::question_for(state).unwrap_or(dialogue::CHOOSE_OPTION_REPLY);
            return Reply::text(question);
        }

        self.store.set_field(sender, field, text);

        let next = match state {
            FlowState::ProposalNewName => FlowState::ProposalNewParticipants,
            FlowState::ProposalNewParticipants => FlowState::ProposalNewContent,
            _ => FlowState::ProposalComplete,
        };

        if next.is_terminal() {
            return self.complete_proposal(sender, state, next);
        }

        self.advance(sender, state, next);
        Reply::text(dialogue::question_for(next).unwrap_or(dialogue::CHOOSE_OPTION_REPLY))
    }

    fn complete_proposal(&self, sender: &str, from: FlowState, terminal: FlowState) -> Reply {
        self.advance(sender, from, terminal);
        let draft = ProposalDraft::from_session(&self.store.get(sender));
        self.store.reset(sender);
        info!(sender = %sender, name = ?draft.name, "Proposal completed");
        Reply::text(draft.summary())
    }

    fn advance(&self, sender: &str, from: FlowState, to: FlowState) {
        debug_assert!(from.can_transition_to(to), "invalid transition {from} -> {to}");
        if !from.can_transition_to(to) {
            warn!(sender = %sender, from = %from, to = %to, "Invalid state transition");
        }
        self.store.set(sender, to);
    }
}
