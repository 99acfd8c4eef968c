//! API Route Configuration
//!
//! The authenticated REST surface: follow/unfollow, follower listings, and
//! message history. Every route here sits behind the auth middleware.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::auth::auth_middleware;
use crate::delivery::handlers::get_history;
use crate::graph::handlers::{follow_user, get_followers, get_following, unfollow_user};
use crate::server::state::AppState;

/// Build the `/api` routes with the auth middleware applied.
pub fn configure_api_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/api/follow/{target_id}",
            post(follow_user).delete(unfollow_user),
        )
        .route("/api/users/{id}/followers", get(get_followers))
        .route("/api/users/{id}/following", get(get_following))
        .route("/api/messages/{counterpart_id}", get(get_history))
        .layer(middleware::from_fn_with_state(app_state, auth_middleware))
}
