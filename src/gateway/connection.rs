/**
 * Connection Gateway
 *
 * Terminates long-lived WebSocket connections. Each connection is one unit
 * of concurrent work: a reader task that routes inbound events to the
 * delivery channel and a writer task that drains the connection's outbound
 * queue and the presence event stream into the socket. The two sides talk
 * through an mpsc channel, never shared closures.
 *
 * # Lifecycle
 *
 * 1. Resolve the bearer token to a user id (external auth contract).
 * 2. Register the connection with the presence registry.
 * 3. Queue the initial `online-users` snapshot.
 * 4. Run reader + writer until the socket closes, errors, or the peer
 *    stops answering heartbeats.
 * 5. Deregister exactly once, on every exit path.
 */

use std::sync::{Arc, Mutex};
use std::time::Instant;

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::{header::AUTHORIZATION, HeaderMap},
    response::Response,
};
use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use uuid::Uuid;

use crate::auth::user_id_from_token;
use crate::error::CoreError;
use crate::presence::{ConnectionHandle, ConnectionId, PresenceEvent};
use crate::server::state::AppState;
use crate::shared::{ClientEvent, ServerEvent};

/// Outbound queue depth per connection. A slow consumer that falls this
/// far behind loses pushes and reconciles via history fetch.
const OUTBOUND_QUEUE: usize = 64;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub token: Option<String>,
}

/// GET /ws - upgrade to a persistent connection.
///
/// The token is accepted either as `?token=` (browser WebSocket clients
/// cannot set headers) or as a standard bearer Authorization header.
pub async fn ws_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, CoreError> {
    let token = query
        .token
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|h| h.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
                .map(str::to_string)
        })
        .ok_or_else(|| CoreError::unauthorized("Missing token"))?;

    let user_id = user_id_from_token(&token)?;
    if !state.directory.exists(user_id).await? {
        return Err(CoreError::unauthorized("Unknown user"));
    }

    Ok(ws.on_upgrade(move |socket| handle_connection(state, user_id, socket)))
}

/// Drive one established connection to completion.
async fn handle_connection(state: AppState, user_id: Uuid, socket: WebSocket) {
    let conn_id = ConnectionId::new();
    let (outbound_tx, outbound_rx) = mpsc::channel::<ServerEvent>(OUTBOUND_QUEUE);

    state.presence.register(
        user_id,
        ConnectionHandle {
            id: conn_id,
            outbound: outbound_tx.clone(),
        },
    );
    tracing::info!(%user_id, connection = %conn_id, "connection established");

    // Initial snapshot goes through the same outbound queue as everything
    // else, so ordering relative to pushed events is well defined.
    let snapshot = ServerEvent::OnlineUsers {
        users: state.presence.snapshot_online_users(),
    };
    let _ = outbound_tx.send(snapshot).await;

    let presence_events = BroadcastStream::new(state.presence.subscribe());
    let last_seen = Arc::new(Mutex::new(Instant::now()));

    let (ws_tx, ws_rx) = socket.split();

    let mut writer = tokio::spawn(write_loop(
        ws_tx,
        outbound_rx,
        presence_events,
        last_seen.clone(),
        state.clone(),
        user_id,
    ));
    let mut reader = tokio::spawn(read_loop(
        ws_rx,
        state.clone(),
        user_id,
        outbound_tx.clone(),
        last_seen.clone(),
    ));

    // Whichever side exits first tears the other down. The reader exits on
    // close or socket error; the writer exits on heartbeat timeout. A
    // silently dead peer never wakes the reader, so the writer's timeout is
    // the only exit on that path and must not wait for the reader.
    tokio::select! {
        _ = &mut writer => {
            reader.abort();
            let _ = reader.await;
        }
        _ = &mut reader => {
            writer.abort();
            let _ = writer.await;
        }
    }

    // Exactly one deregister per connection, on every exit path. The
    // registry tolerates duplicates, but this is the single call site.
    state.presence.deregister(user_id, conn_id);
    tracing::info!(%user_id, connection = %conn_id, "connection closed");
}

/// Drain outbound events, presence transitions, and heartbeat ticks into
/// the socket. Exits on send failure or heartbeat timeout.
async fn write_loop(
    mut ws_tx: SplitSink<WebSocket, WsMessage>,
    mut outbound_rx: mpsc::Receiver<ServerEvent>,
    mut presence_events: BroadcastStream<PresenceEvent>,
    last_seen: Arc<Mutex<Instant>>,
    state: AppState,
    user_id: Uuid,
) {
    let mut heartbeat = tokio::time::interval(state.config.heartbeat_interval);
    // First tick fires immediately; skip it so the timeout window starts
    // at connect, not before.
    heartbeat.tick().await;

    loop {
        tokio::select! {
            event = outbound_rx.recv() => {
                let Some(event) = event else { break };
                if send_event(&mut ws_tx, &event).await.is_err() {
                    break;
                }
            }
            event = presence_events.next() => {
                match event {
                    Some(Ok(PresenceEvent { user_id: changed, online })) => {
                        let event = ServerEvent::PresenceChanged { user_id: changed, online };
                        if send_event(&mut ws_tx, &event).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                        // Transitions were missed; the client still holds a
                        // consistent view after its next snapshot.
                        tracing::warn!(%user_id, skipped, "presence stream lagged");
                    }
                    None => break,
                }
            }
            _ = heartbeat.tick() => {
                let silent_for = last_seen.lock().unwrap().elapsed();
                if silent_for > state.config.heartbeat_timeout {
                    tracing::warn!(
                        %user_id,
                        ?silent_for,
                        "heartbeat timeout, closing connection"
                    );
                    let _ = ws_tx.send(WsMessage::Close(None)).await;
                    break;
                }
                if send_event(&mut ws_tx, &ServerEvent::Ping).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Route inbound frames until the socket closes or errors.
async fn read_loop(
    mut ws_rx: SplitStream<WebSocket>,
    state: AppState,
    user_id: Uuid,
    reply_tx: mpsc::Sender<ServerEvent>,
    last_seen: Arc<Mutex<Instant>>,
) {
    while let Some(Ok(frame)) = ws_rx.next().await {
        *last_seen.lock().unwrap() = Instant::now();
        match frame {
            WsMessage::Text(text) => {
                handle_client_event(&state, user_id, text.as_str(), &reply_tx).await;
            }
            WsMessage::Close(_) => break,
            // Transport pings are answered by axum; pongs and binary
            // frames only refresh liveness.
            _ => {}
        }
    }
}

/// Dispatch one parsed client event.
async fn handle_client_event(
    state: &AppState,
    user_id: Uuid,
    text: &str,
    reply_tx: &mpsc::Sender<ServerEvent>,
) {
    match serde_json::from_str::<ClientEvent>(text) {
        Ok(ClientEvent::SendMessage { recipient_id, body }) => {
            match state.delivery.send_message(user_id, recipient_id, body).await {
                Ok(message) => {
                    let _ = reply_tx.send(ServerEvent::MessageSent { message }).await;
                }
                Err(err) => {
                    tracing::debug!(%user_id, "send-message rejected: {err}");
                    let _ = reply_tx
                        .send(ServerEvent::Error {
                            message: err.message(),
                        })
                        .await;
                }
            }
        }
        Ok(ClientEvent::Pong) => {
            // Liveness already refreshed by the caller.
        }
        Err(err) => {
            tracing::debug!(%user_id, "unparseable client event: {err}");
            let _ = reply_tx
                .send(ServerEvent::Error {
                    message: "Unrecognized event".to_string(),
                })
                .await;
        }
    }
}

async fn send_event(
    ws_tx: &mut SplitSink<WebSocket, WsMessage>,
    event: &ServerEvent,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event).map_err(axum::Error::new)?;
    ws_tx.send(WsMessage::Text(json.into())).await
}
