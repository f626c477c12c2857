//! Flow Bot — WhatsApp webhook front end driving guided dialogues.

pub mod channels;
pub mod config;
pub mod error;
pub mod flow;
pub mod server;
