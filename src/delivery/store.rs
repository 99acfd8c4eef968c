//! Message Store
//!
//! Append-only storage of messages keyed by conversation. Sequence numbers
//! are allocated by the delivery channel, never here; the store only
//! answers "what is the latest sequence" and appends records.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::error::CoreResult;
use crate::shared::{ConversationKey, Message};

/// Append-only message storage.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Latest sequence number in the conversation, 0 if empty.
    async fn last_sequence(&self, conversation: ConversationKey) -> CoreResult<i64>;

    /// Durably append one message.
    async fn append(&self, message: &Message) -> CoreResult<()>;

    /// Messages with `seq > since_seq`, ascending by sequence.
    async fn messages_after(
        &self,
        conversation: ConversationKey,
        since_seq: i64,
    ) -> CoreResult<Vec<Message>>;
}

/// Messages stored in the `messages` table.
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn last_sequence(&self, conversation: ConversationKey) -> CoreResult<i64> {
        let row = sqlx::query(
            "SELECT COALESCE(MAX(seq), 0) AS last_seq FROM messages WHERE conversation_id = $1",
        )
        .bind(conversation.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.get("last_seq"))
    }

    async fn append(&self, message: &Message) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, recipient_id, body, seq, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(message.id)
        .bind(&message.conversation_id)
        .bind(message.sender_id)
        .bind(message.recipient_id)
        .bind(&message.body)
        .bind(message.seq)
        .bind(message.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn messages_after(
        &self,
        conversation: ConversationKey,
        since_seq: i64,
    ) -> CoreResult<Vec<Message>> {
        let rows = sqlx::query(
            r#"
            SELECT id, conversation_id, sender_id, recipient_id, body, seq, created_at
            FROM messages
            WHERE conversation_id = $1 AND seq > $2
            ORDER BY seq ASC
            "#,
        )
        .bind(conversation.to_string())
        .bind(since_seq)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Message {
                id: row.get("id"),
                conversation_id: row.get("conversation_id"),
                sender_id: row.get("sender_id"),
                recipient_id: row.get("recipient_id"),
                body: row.get("body"),
                seq: row.get("seq"),
                created_at: row.get("created_at"),
            })
            .collect())
    }
}

/// Messages held in process memory, used when no database is configured
/// and by tests.
#[derive(Default)]
pub struct MemoryMessageStore {
    conversations: Mutex<HashMap<ConversationKey, Vec<Message>>>,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn last_sequence(&self, conversation: ConversationKey) -> CoreResult<i64> {
        let conversations = self.conversations.lock().unwrap();
        Ok(conversations
            .get(&conversation)
            .and_then(|log| log.last())
            .map(|m| m.seq)
            .unwrap_or(0))
    }

    async fn append(&self, message: &Message) -> CoreResult<()> {
        let key = ConversationKey::of(message.sender_id, message.recipient_id);
        self.conversations
            .lock()
            .unwrap()
            .entry(key)
            .or_default()
            .push(message.clone());
        Ok(())
    }

    async fn messages_after(
        &self,
        conversation: ConversationKey,
        since_seq: i64,
    ) -> CoreResult<Vec<Message>> {
        let conversations = self.conversations.lock().unwrap();
        Ok(conversations
            .get(&conversation)
            .map(|log| {
                log.iter()
                    .filter(|m| m.seq > since_seq)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_last_sequence_of_empty_conversation() {
        let store = MemoryMessageStore::new();
        let key = ConversationKey::of(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(store.last_sequence(key).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_append_and_fetch_after() {
        let store = MemoryMessageStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let key = ConversationKey::of(a, b);

        for seq in 1..=3 {
            let msg = Message::new(key, a, b, format!("m{seq}"), seq);
            store.append(&msg).await.unwrap();
        }

        assert_eq!(store.last_sequence(key).await.unwrap(), 3);

        let tail = store.messages_after(key, 1).await.unwrap();
        let seqs: Vec<i64> = tail.iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![2, 3]);
    }
}
