/**
 * Message Delivery Channel
 *
 * Accepts a send request, persists it, and pushes it to the recipient's
 * live connections if there are any. Durability precedes delivery: the
 * message is on disk before any push is attempted, so a crash between the
 * two cannot lose it.
 *
 * # Sequence Allocation
 *
 * Sequence numbers are strictly increasing and gapless per conversation.
 * Allocation happens under a per-conversation async mutex - the single
 * point of increment. No other component assigns sequence numbers.
 *
 * # Delivery Semantics
 *
 * Push to a handle is best-effort and never retried; a handle that has
 * silently died simply misses the push. `fetch_history` is the correctness
 * backstop that upgrades best-effort push into effectively reliable
 * delivery: clients reconcile on reconnect.
 */

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use uuid::Uuid;

use crate::delivery::store::MessageStore;
use crate::directory::UserDirectory;
use crate::error::{CoreError, CoreResult};
use crate::presence::PresenceRegistry;
use crate::shared::{ConversationKey, Message, ServerEvent};

/// Bounded attempts for the persistence step. Push is never retried.
const PERSIST_ATTEMPTS: u32 = 3;

pub struct DeliveryChannel {
    store: Arc<dyn MessageStore>,
    presence: Arc<PresenceRegistry>,
    directory: Arc<dyn UserDirectory>,
    seq_locks: Mutex<HashMap<ConversationKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl DeliveryChannel {
    pub fn new(
        store: Arc<dyn MessageStore>,
        presence: Arc<PresenceRegistry>,
        directory: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            store,
            presence,
            directory,
            seq_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Persist a message and push it to the recipient's live connections.
    ///
    /// Returns the persisted record, including its assigned sequence
    /// number, regardless of whether the recipient was online.
    pub async fn send_message(
        &self,
        sender: Uuid,
        recipient: Uuid,
        body: String,
    ) -> CoreResult<Message> {
        if sender == recipient {
            return Err(CoreError::invalid("You cannot message yourself"));
        }
        if body.trim().is_empty() {
            return Err(CoreError::invalid("Message body cannot be empty"));
        }
        if !self.directory.exists(recipient).await? {
            return Err(CoreError::not_found("Recipient not found"));
        }

        let conversation = ConversationKey::of(sender, recipient);

        // Single-writer discipline per conversation: allocation and append
        // happen under the conversation's lock, so concurrent sends in the
        // same conversation cannot observe the same last_sequence.
        let lock = self.conversation_lock(conversation);
        let message = {
            let _guard = lock.lock().await;
            self.persist_with_retry(conversation, sender, recipient, body)
                .await?
        };

        self.push_to_recipient(&message).await;

        Ok(message)
    }

    /// Messages of the conversation between `user` and `counterpart` with
    /// sequence number greater than `since_seq`, ascending.
    pub async fn fetch_history(
        &self,
        user: Uuid,
        counterpart: Uuid,
        since_seq: i64,
    ) -> CoreResult<Vec<Message>> {
        if !self.directory.exists(counterpart).await? {
            return Err(CoreError::not_found("User not found"));
        }
        let conversation = ConversationKey::of(user, counterpart);
        self.store.messages_after(conversation, since_seq).await
    }

    /// Drop conversation locks nobody is holding. Run periodically so the
    /// lock map does not grow with every conversation ever seen.
    pub fn release_idle_locks(&self) {
        self.seq_locks
            .lock()
            .unwrap()
            .retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    fn conversation_lock(&self, conversation: ConversationKey) -> Arc<tokio::sync::Mutex<()>> {
        self.seq_locks
            .lock()
            .unwrap()
            .entry(conversation)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Allocate the next sequence number and append, with bounded retry.
    ///
    /// The sequence is re-read on every attempt: a failed append may mean
    /// another process claimed the slot (the store's uniqueness constraint
    /// fires), so re-appending the same record would only collide again.
    /// Runs under the conversation lock held by the caller.
    async fn persist_with_retry(
        &self,
        conversation: ConversationKey,
        sender: Uuid,
        recipient: Uuid,
        body: String,
    ) -> CoreResult<Message> {
        let mut attempt = 1;
        loop {
            let seq = self.store.last_sequence(conversation).await? + 1;
            let message = Message::new(conversation, sender, recipient, body.clone(), seq);
            match self.store.append(&message).await {
                Ok(()) => return Ok(message),
                Err(err) if attempt < PERSIST_ATTEMPTS => {
                    tracing::warn!(
                        conversation = %message.conversation_id,
                        seq,
                        "persist attempt {attempt} failed, retrying: {err}"
                    );
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(50 * u64::from(attempt))).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Fan-out to every live handle of the recipient. Fire-and-forget:
    /// a full or closed handle is traced and skipped.
    async fn push_to_recipient(&self, message: &Message) {
        let handles = self.presence.handles_for(message.recipient_id);
        if handles.is_empty() {
            tracing::debug!(
                recipient = %message.recipient_id,
                "recipient offline, message left for history fetch"
            );
            return;
        }

        for handle in handles {
            let event = ServerEvent::NewMessage {
                message: message.clone(),
            };
            if let Err(err) = handle.outbound.try_send(event) {
                tracing::debug!(
                    recipient = %message.recipient_id,
                    connection = %handle.id,
                    "push skipped: {err}"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::store::MemoryMessageStore;
    use crate::directory::MemoryUserDirectory;
    use crate::presence::{ConnectionHandle, ConnectionId};
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::mpsc;

    struct Fixture {
        channel: Arc<DeliveryChannel>,
        presence: Arc<PresenceRegistry>,
        alice: Uuid,
        bob: Uuid,
    }

    fn fixture() -> Fixture {
        let directory = Arc::new(MemoryUserDirectory::new());
        let alice = directory.insert("alice", "alice@example.com");
        let bob = directory.insert("bob", "bob@example.com");
        let presence = Arc::new(PresenceRegistry::new());
        let channel = Arc::new(DeliveryChannel::new(
            Arc::new(MemoryMessageStore::new()),
            presence.clone(),
            directory,
        ));
        Fixture {
            channel,
            presence,
            alice,
            bob,
        }
    }

    fn connect(
        presence: &PresenceRegistry,
        user: Uuid,
    ) -> (ConnectionId, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(8);
        let id = ConnectionId::new();
        presence.register(
            user,
            ConnectionHandle {
                id,
                outbound: tx,
            },
        );
        (id, rx)
    }

    #[tokio::test]
    async fn test_self_message_rejected() {
        let f = fixture();
        let err = f
            .channel
            .send_message(f.alice, f.alice, "hi".to_string())
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::InvalidOperation { .. });
    }

    #[tokio::test]
    async fn test_empty_body_rejected() {
        let f = fixture();
        let err = f
            .channel
            .send_message(f.alice, f.bob, "   ".to_string())
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::InvalidOperation { .. });
    }

    #[tokio::test]
    async fn test_unknown_recipient_rejected() {
        let f = fixture();
        let err = f
            .channel
            .send_message(f.alice, Uuid::new_v4(), "hi".to_string())
            .await
            .unwrap_err();
        assert_matches!(err, CoreError::NotFound { .. });
    }

    #[tokio::test]
    async fn test_sequences_are_gapless_from_one() {
        let f = fixture();
        for i in 1..=5 {
            let msg = f
                .channel
                .send_message(f.alice, f.bob, format!("m{i}"))
                .await
                .unwrap();
            assert_eq!(msg.seq, i);
        }

        let history = f.channel.fetch_history(f.bob, f.alice, 0).await.unwrap();
        let seqs: Vec<i64> = history.iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_concurrent_sends_do_not_duplicate_sequences() {
        let f = fixture();
        let mut handles = Vec::new();
        for i in 0..10 {
            let channel = f.channel.clone();
            let (alice, bob) = (f.alice, f.bob);
            handles.push(tokio::spawn(async move {
                channel.send_message(alice, bob, format!("m{i}")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let history = f.channel.fetch_history(f.alice, f.bob, 0).await.unwrap();
        let seqs: Vec<i64> = history.iter().map(|m| m.seq).collect();
        assert_eq!(seqs, (1..=10).collect::<Vec<i64>>());
    }

    #[tokio::test]
    async fn test_online_recipient_receives_push_on_every_handle() {
        let f = fixture();
        let (_id1, mut rx1) = connect(&f.presence, f.bob);
        let (_id2, mut rx2) = connect(&f.presence, f.bob);

        let sent = f
            .channel
            .send_message(f.alice, f.bob, "hello".to_string())
            .await
            .unwrap();

        for rx in [&mut rx1, &mut rx2] {
            match rx.try_recv().unwrap() {
                ServerEvent::NewMessage { message } => assert_eq!(message, sent),
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_offline_send_then_history_reconciles() {
        // Scenario from the delivery contract: push while online, miss
        // while offline, recover everything via history fetch.
        let f = fixture();

        let (conn, mut rx) = connect(&f.presence, f.alice);
        let first = f
            .channel
            .send_message(f.bob, f.alice, "while online".to_string())
            .await
            .unwrap();
        match rx.try_recv().unwrap() {
            ServerEvent::NewMessage { message } => assert_eq!(message, first),
            other => panic!("unexpected event: {other:?}"),
        }

        f.presence.deregister(f.alice, conn);
        let second = f
            .channel
            .send_message(f.bob, f.alice, "while offline".to_string())
            .await
            .unwrap();
        assert_eq!(second.seq, 2);

        // Reconnect and reconcile.
        let (_conn2, _rx2) = connect(&f.presence, f.alice);
        let history = f.channel.fetch_history(f.alice, f.bob, 0).await.unwrap();
        assert_eq!(history, vec![first, second]);
    }

    /// Store double simulating a rival process winning the sequence slot:
    /// the first append finds a rival record already holding its seq and
    /// fails the way the uniqueness constraint would.
    struct RacedStore {
        inner: MemoryMessageStore,
        race_pending: AtomicBool,
    }

    #[async_trait::async_trait]
    impl MessageStore for RacedStore {
        async fn last_sequence(&self, conversation: ConversationKey) -> CoreResult<i64> {
            self.inner.last_sequence(conversation).await
        }

        async fn append(&self, message: &Message) -> CoreResult<()> {
            if self.race_pending.swap(false, Ordering::SeqCst) {
                let key = ConversationKey::of(message.sender_id, message.recipient_id);
                let rival = Message::new(
                    key,
                    message.recipient_id,
                    message.sender_id,
                    "rival".to_string(),
                    message.seq,
                );
                self.inner.append(&rival).await?;
                return Err(CoreError::Store(sqlx::Error::PoolClosed));
            }
            self.inner.append(message).await
        }

        async fn messages_after(
            &self,
            conversation: ConversationKey,
            since_seq: i64,
        ) -> CoreResult<Vec<Message>> {
            self.inner.messages_after(conversation, since_seq).await
        }
    }

    #[tokio::test]
    async fn test_lost_sequence_race_reallocates_on_retry() {
        let directory = Arc::new(MemoryUserDirectory::new());
        let alice = directory.insert("alice", "alice@example.com");
        let bob = directory.insert("bob", "bob@example.com");
        let channel = DeliveryChannel::new(
            Arc::new(RacedStore {
                inner: MemoryMessageStore::new(),
                race_pending: AtomicBool::new(true),
            }),
            Arc::new(PresenceRegistry::new()),
            directory,
        );

        let sent = channel
            .send_message(alice, bob, "after race".to_string())
            .await
            .unwrap();
        // The rival claimed seq 1; the retry re-read and took seq 2.
        assert_eq!(sent.seq, 2);

        let history = channel.fetch_history(alice, bob, 0).await.unwrap();
        let seqs: Vec<i64> = history.iter().map(|m| m.seq).collect();
        assert_eq!(seqs, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_idle_locks_are_released() {
        let f = fixture();
        f.channel
            .send_message(f.alice, f.bob, "hi".to_string())
            .await
            .unwrap();

        assert_eq!(f.channel.seq_locks.lock().unwrap().len(), 1);
        f.channel.release_idle_locks();
        assert!(f.channel.seq_locks.lock().unwrap().is_empty());
    }
}
