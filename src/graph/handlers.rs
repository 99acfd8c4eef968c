//! Follow Route Handlers
//!
//! REST surface over the Social Graph Manager. Responses follow the
//! `{success, message}` contract; both follow and unfollow are idempotent,
//! so a repeated call reports success with a no-op message.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::CoreError;
use crate::graph::{EdgeChange, SocialGraphManager};
use crate::shared::UserSummary;

#[derive(Debug, Serialize, Deserialize)]
pub struct FollowResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FollowersResponse {
    pub success: bool,
    pub followers: Vec<UserSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FollowingResponse {
    pub success: bool,
    pub following: Vec<UserSummary>,
}

/// POST /api/follow/{target_id}
pub async fn follow_user(
    State(graph): State<Arc<SocialGraphManager>>,
    AuthUser(user): AuthUser,
    Path(target_id): Path<Uuid>,
) -> Result<Json<FollowResponse>, CoreError> {
    let change = graph.follow(user.user_id, target_id).await?;
    Ok(Json(FollowResponse {
        success: true,
        message: match change {
            EdgeChange::Applied => "Followed successfully".to_string(),
            EdgeChange::NoOp => "Already following".to_string(),
        },
    }))
}

/// DELETE /api/follow/{target_id}
pub async fn unfollow_user(
    State(graph): State<Arc<SocialGraphManager>>,
    AuthUser(user): AuthUser,
    Path(target_id): Path<Uuid>,
) -> Result<Json<FollowResponse>, CoreError> {
    let change = graph.unfollow(user.user_id, target_id).await?;
    Ok(Json(FollowResponse {
        success: true,
        message: match change {
            EdgeChange::Applied => "Unfollowed successfully".to_string(),
            EdgeChange::NoOp => "Not following".to_string(),
        },
    }))
}

/// GET /api/users/{id}/followers
pub async fn get_followers(
    State(graph): State<Arc<SocialGraphManager>>,
    _auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<FollowersResponse>, CoreError> {
    let followers = graph.list_followers(user_id).await?;
    Ok(Json(FollowersResponse {
        success: true,
        followers,
    }))
}

/// GET /api/users/{id}/following
pub async fn get_following(
    State(graph): State<Arc<SocialGraphManager>>,
    _auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<FollowingResponse>, CoreError> {
    let following = graph.list_following(user_id).await?;
    Ok(Json(FollowingResponse {
        success: true,
        following,
    }))
}
