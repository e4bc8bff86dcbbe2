//! Reasoning-engine collaborator
//!
//! Knowledge-point tagging is delegated to a chat-completion API
//! (DeepSeek). The reply is a transport envelope whose
//! `choices[0].message.content` is itself a JSON-encoded object; the inner
//! payload is validated against `TagAnalysis` before anything is persisted,
//! and a reply that fails that validation gets its own error kind.

mod client;
mod types;

pub use client::*;
pub use types::*;
