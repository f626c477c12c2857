//! Conversation flow engine — per-sender guided dialogues.
//!
//! A sender starts at `Idle`, picks a top-level option, and is walked through
//! the chosen flow one message at a time. The engine is pure decision logic
//! over a [`SessionStore`]; delivering replies is the caller's job.

pub mod dialogue;
pub mod engine;
pub mod session;
pub mod state;

pub use dialogue::{PromptOption, PromptSpec, PromptStyle, ProposalDraft};
pub use engine::{FlowEngine, InboundMessage, Reply};
pub use session::{InMemorySessionStore, Session, SessionStore, spawn_session_sweep};
pub use state::{FlowKind, FlowState, InputKind};
