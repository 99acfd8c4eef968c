//! History Route Handler
//!
//! REST handler for the history fetch that backstops best-effort push:
//! a client that missed pushes while offline replays the conversation tail
//! from its last known sequence number.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::delivery::DeliveryChannel;
use crate::error::CoreError;
use crate::shared::Message;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Replay messages with sequence number greater than this; defaults
    /// to 0 (the whole conversation).
    #[serde(default)]
    pub since: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub messages: Vec<Message>,
}

/// GET /api/messages/{counterpart_id}?since=N
pub async fn get_history(
    State(delivery): State<Arc<DeliveryChannel>>,
    AuthUser(user): AuthUser,
    Path(counterpart_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, CoreError> {
    let messages = delivery
        .fetch_history(user.user_id, counterpart_id, query.since)
        .await?;
    Ok(Json(HistoryResponse {
        success: true,
        messages,
    }))
}
