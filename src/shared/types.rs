//! Core Wire Types
//!
//! Messages, conversation keys, and user summaries as they travel over the
//! REST and WebSocket surfaces and into the stores.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical, order-independent key for the conversation between two users.
///
/// The two participant ids are sorted so that `ConversationKey::of(a, b)` and
/// `ConversationKey::of(b, a)` are the same key. Rendered as `"{lo}:{hi}"`
/// when a string form is needed (storage, logging).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    lo: Uuid,
    hi: Uuid,
}

impl ConversationKey {
    /// Build the canonical key for the pair of users, in either order.
    pub fn of(a: Uuid, b: Uuid) -> Self {
        if a <= b {
            Self { lo: a, hi: b }
        } else {
            Self { lo: b, hi: a }
        }
    }

    /// The lexicographically smaller participant.
    pub fn lo(&self) -> Uuid {
        self.lo
    }

    /// The lexicographically larger participant.
    pub fn hi(&self) -> Uuid {
        self.hi
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.lo, self.hi)
    }
}

/// An immutable chat message.
///
/// Ordering within a conversation is defined by `seq`, never by
/// `created_at`: clock skew across delivery paths must not reorder messages.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Unique message ID
    pub id: Uuid,
    /// Canonical conversation key, rendered as `"{lo}:{hi}"`
    pub conversation_id: String,
    /// User who sent the message
    pub sender_id: Uuid,
    /// User the message is addressed to
    pub recipient_id: Uuid,
    /// Message body
    pub body: String,
    /// Strictly increasing, gapless sequence number within the conversation
    pub seq: i64,
    /// When the message was persisted
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a message record for the given conversation slot.
    ///
    /// The caller (the delivery channel) owns sequence allocation; this
    /// constructor only assembles the record.
    pub fn new(
        conversation: ConversationKey,
        sender_id: Uuid,
        recipient_id: Uuid,
        body: String,
        seq: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            conversation_id: conversation.to_string(),
            sender_id,
            recipient_id,
            body,
            seq,
            created_at: Utc::now(),
        }
    }
}

/// Public view of a user account, as returned by follower/following
/// listings. The full account record lives with the external account
/// service; this core only ever reads summaries through the directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_key_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(ConversationKey::of(a, b), ConversationKey::of(b, a));
        assert_eq!(
            ConversationKey::of(a, b).to_string(),
            ConversationKey::of(b, a).to_string()
        );
    }

    #[test]
    fn conversation_key_orders_participants() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let key = ConversationKey::of(a, b);
        assert!(key.lo() <= key.hi());
    }

    #[test]
    fn message_serializes_with_sequence() {
        let key = ConversationKey::of(Uuid::new_v4(), Uuid::new_v4());
        let msg = Message::new(key, key.lo(), key.hi(), "hello".to_string(), 1);
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.seq, 1);
        assert_eq!(back.conversation_id, key.to_string());
    }
}
