/**
 * Server Initialization
 *
 * Builds the application state and router. Store selection is decided
 * here: PostgreSQL-backed stores when a database is configured,
 * process-memory stores otherwise. Components only ever see the store
 * traits, so the rest of the system is identical either way.
 */

use std::sync::Arc;
use std::time::Duration;

use axum::Router;

use crate::delivery::{DeliveryChannel, MemoryMessageStore, MessageStore, PgMessageStore};
use crate::directory::{MemoryUserDirectory, PgUserDirectory, UserDirectory};
use crate::graph::{GraphStore, MemoryGraphStore, PgGraphStore, SocialGraphManager};
use crate::presence::PresenceRegistry;
use crate::routes::create_router;
use crate::server::config::{load_database, ServerConfig};
use crate::server::state::AppState;

/// Create and configure the Axum application.
///
/// 1. Load configuration and (optionally) the database pool.
/// 2. Pick store implementations and assemble the components.
/// 3. Spawn the periodic lock-map cleanup task.
/// 4. Build the router.
pub async fn create_app() -> Router<()> {
    tracing::info!("Initializing server");

    let config = ServerConfig::from_env();
    let db_pool = load_database().await;

    let (graph_store, message_store, directory): (
        Arc<dyn GraphStore>,
        Arc<dyn MessageStore>,
        Arc<dyn UserDirectory>,
    ) = match db_pool {
        Some(pool) => (
            Arc::new(PgGraphStore::new(pool.clone())),
            Arc::new(PgMessageStore::new(pool.clone())),
            Arc::new(PgUserDirectory::new(pool)),
        ),
        None => (
            Arc::new(MemoryGraphStore::new()),
            Arc::new(MemoryMessageStore::new()),
            Arc::new(MemoryUserDirectory::new()),
        ),
    };

    let app_state = assemble_state(graph_store, message_store, directory, config);

    // Periodically drop per-conversation sequence locks nobody holds.
    let cleanup_delivery = app_state.delivery.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300));
        loop {
            interval.tick().await;
            cleanup_delivery.release_idle_locks();
            tracing::debug!("released idle conversation locks");
        }
    });

    tracing::info!("Router configured");
    create_router(app_state)
}

/// Wire the core components over the given stores. Shared by `create_app`
/// and tests (which pass in-memory stores and a seeded directory).
pub fn assemble_state(
    graph_store: Arc<dyn GraphStore>,
    message_store: Arc<dyn MessageStore>,
    directory: Arc<dyn UserDirectory>,
    config: ServerConfig,
) -> AppState {
    let presence = Arc::new(PresenceRegistry::new());
    let graph = Arc::new(SocialGraphManager::new(graph_store, directory.clone()));
    let delivery = Arc::new(DeliveryChannel::new(
        message_store,
        presence.clone(),
        directory.clone(),
    ));

    AppState {
        graph,
        presence,
        delivery,
        directory,
        config,
    }
}
