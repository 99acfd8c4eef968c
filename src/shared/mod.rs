//! Shared Types Module
//!
//! Types that cross the process boundary: message records, conversation
//! keys, user summaries, and the WebSocket event contracts. Everything here
//! is plain serde data with no server-side state attached.

/// Message, conversation key, and user summary types
pub mod types;

/// WebSocket event contracts
pub mod event;

pub use event::{ClientEvent, ServerEvent};
pub use types::{ConversationKey, Message, UserSummary};
