/**
 * Presence Registry
 *
 * Process-wide table mapping a user to the set of currently active
 * connections. One user may hold several simultaneous connections
 * (multiple tabs/devices); the user counts as online while at least one
 * handle is live.
 *
 * # Lifecycle
 *
 * An entry is created by the first `register` for a user and deleted by
 * the `deregister` that empties its handle set. The registry holds no
 * durable truth: it is advisory, in-memory state rebuilt from zero active
 * connections on restart.
 *
 * # Concurrency
 *
 * All methods take the inner std mutex once and never await while holding
 * it, so register/deregister complete without blocking on network I/O.
 * Online/offline transitions are published on a broadcast channel that
 * gateway writer tasks subscribe to.
 */

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use crate::shared::ServerEvent;

/// Identifier of one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Outbound side of one live connection. Pushing through a dead handle is
/// harmless; the gateway removes it on disconnect.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub outbound: mpsc::Sender<ServerEvent>,
}

/// Online/offline transition event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceEvent {
    pub user_id: Uuid,
    pub online: bool,
}

pub struct PresenceRegistry {
    entries: Mutex<HashMap<Uuid, HashMap<ConnectionId, ConnectionHandle>>>,
    events: broadcast::Sender<PresenceEvent>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        // Capacity sized for bursts of connects/disconnects; a lagged
        // subscriber misses transitions, not correctness (snapshots exist).
        let (events, _) = broadcast::channel(256);
        Self {
            entries: Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Add a handle for the user, creating the entry if absent. Emits a
    /// presence-changed event when this is the user's first live handle.
    pub fn register(&self, user_id: Uuid, handle: ConnectionHandle) {
        let went_online = {
            let mut entries = self.entries.lock().unwrap();
            let handles = entries.entry(user_id).or_default();
            let was_empty = handles.is_empty();
            handles.insert(handle.id, handle);
            was_empty
        };

        if went_online {
            tracing::info!(%user_id, "user online");
            let _ = self.events.send(PresenceEvent {
                user_id,
                online: true,
            });
        }
    }

    /// Remove a handle. Deletes the entry and emits a presence-changed
    /// event when the handle set empties. Idempotent and infallible: this
    /// runs on teardown paths where nobody waits for a result.
    pub fn deregister(&self, user_id: Uuid, conn_id: ConnectionId) {
        let went_offline = {
            let mut entries = self.entries.lock().unwrap();
            match entries.get_mut(&user_id) {
                Some(handles) => {
                    handles.remove(&conn_id);
                    if handles.is_empty() {
                        entries.remove(&user_id);
                        true
                    } else {
                        false
                    }
                }
                None => false,
            }
        };

        if went_offline {
            tracing::info!(%user_id, "user offline");
            let _ = self.events.send(PresenceEvent {
                user_id,
                online: false,
            });
        }
    }

    /// True iff the user has at least one live handle.
    pub fn is_online(&self, user_id: Uuid) -> bool {
        self.entries.lock().unwrap().contains_key(&user_id)
    }

    /// Point-in-time snapshot of users with at least one handle. Callers
    /// needing live updates consume presence events via `subscribe`.
    pub fn snapshot_online_users(&self) -> Vec<Uuid> {
        let mut users: Vec<Uuid> = self.entries.lock().unwrap().keys().copied().collect();
        users.sort();
        users
    }

    /// All live handles of one user, for fan-out delivery.
    pub fn handles_for(&self, user_id: Uuid) -> Vec<ConnectionHandle> {
        self.entries
            .lock()
            .unwrap()
            .get(&user_id)
            .map(|handles| handles.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Subscribe to online/offline transitions.
    pub fn subscribe(&self) -> broadcast::Receiver<PresenceEvent> {
        self.events.subscribe()
    }

    /// Deregister every handle, emitting offline events. Used at shutdown.
    pub fn drain(&self) {
        let users: Vec<Uuid> = self.entries.lock().unwrap().keys().copied().collect();
        for user_id in users {
            let ids: Vec<ConnectionId> = self
                .entries
                .lock()
                .unwrap()
                .get(&user_id)
                .map(|handles| handles.keys().copied().collect())
                .unwrap_or_default();
            for conn_id in ids {
                self.deregister(user_id, conn_id);
            }
        }
    }
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
