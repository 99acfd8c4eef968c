/**
 * Router Configuration
 *
 * Assembles the full Axum router:
 *
 * 1. `GET /health` - unauthenticated healthcheck
 * 2. `GET /ws` - persistent connection upgrade (token-authenticated)
 * 3. `/api/...` - authenticated REST routes
 * 4. Fallback - 404 for unknown routes
 *
 * CORS mirrors the frontend contract: one allowed origin with
 * credentials, configurable via CLIENT_ORIGIN.
 */

use axum::{http::HeaderValue, routing::get, Json, Router};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::gateway::ws_handler;
use crate::routes::api_routes::configure_api_routes;
use crate::server::state::AppState;

/// Create the Axum router with all routes configured.
pub fn create_router(app_state: AppState) -> Router<()> {
    let router = Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .merge(configure_api_routes(app_state.clone()));

    let router = router.fallback(|| async { "404 Not Found" });

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer()),
        )
        .with_state(app_state)
}

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "message": "Server is up",
    }))
}

fn cors_layer() -> CorsLayer {
    let origin = std::env::var("CLIENT_ORIGIN")
        .unwrap_or_else(|_| "http://localhost:5173".to_string());

    match origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(tower_http::cors::AllowMethods::mirror_request())
            .allow_headers(tower_http::cors::AllowHeaders::mirror_request())
            .allow_credentials(true),
        Err(_) => {
            tracing::warn!("invalid CLIENT_ORIGIN, CORS disabled");
            CorsLayer::new()
        }
    }
}
