//! Shared test helpers
//!
//! Builds the application over in-memory stores with a seeded user
//! directory, plus token helpers for the authenticated routes.

use std::sync::Arc;

use axum_test::TestServer;
use uuid::Uuid;

use huddle::delivery::MemoryMessageStore;
use huddle::directory::MemoryUserDirectory;
use huddle::graph::MemoryGraphStore;
use huddle::routes::create_router;
use huddle::server::{assemble_state, AppState, ServerConfig};

pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub directory: Arc<MemoryUserDirectory>,
}

/// Application over in-memory stores, ready to serve requests.
pub fn test_app() -> TestApp {
    let directory = Arc::new(MemoryUserDirectory::new());
    let state = assemble_state(
        Arc::new(MemoryGraphStore::new()),
        Arc::new(MemoryMessageStore::new()),
        directory.clone(),
        ServerConfig::default(),
    );
    let server = TestServer::new(create_router(state.clone())).unwrap();
    TestApp {
        server,
        state,
        directory,
    }
}

/// Bearer token for the given user, as the external issuer would mint it.
pub fn bearer(user_id: Uuid) -> String {
    format!("Bearer {}", huddle::auth::create_token(user_id).unwrap())
}
