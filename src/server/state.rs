/**
 * Application State Management
 *
 * `AppState` is the central state container handed to the axum router. It
 * owns the three core components plus the directory seam, each behind an
 * `Arc` so handlers and spawned connection tasks share them cheaply.
 *
 * The `FromRef` implementations let handlers extract just the component
 * they need instead of the whole state, following axum's recommended
 * pattern.
 */

use std::sync::Arc;

use axum::extract::FromRef;

use crate::delivery::DeliveryChannel;
use crate::directory::UserDirectory;
use crate::graph::SocialGraphManager;
use crate::presence::PresenceRegistry;
use crate::server::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    /// Follow/unfollow operations over the graph store
    pub graph: Arc<SocialGraphManager>,
    /// Live connection table and presence events
    pub presence: Arc<PresenceRegistry>,
    /// Message persistence + fan-out pipeline
    pub delivery: Arc<DeliveryChannel>,
    /// Read-only seam to the external account service
    pub directory: Arc<dyn UserDirectory>,
    /// Server configuration (heartbeat intervals, bind address)
    pub config: ServerConfig,
}

impl FromRef<AppState> for Arc<SocialGraphManager> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.graph.clone()
    }
}

impl FromRef<AppState> for Arc<PresenceRegistry> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.presence.clone()
    }
}

impl FromRef<AppState> for Arc<DeliveryChannel> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.delivery.clone()
    }
}

impl FromRef<AppState> for Arc<dyn UserDirectory> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.directory.clone()
    }
}

impl FromRef<AppState> for ServerConfig {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.config.clone()
    }
}
