/**
 * Server Configuration
 *
 * Configuration comes from environment variables with local-development
 * defaults. Errors here are logged but never fatal: a missing or
 * unreachable database leaves the server running on in-memory stores.
 */

use std::time::Duration;

use sqlx::PgPool;

/// Runtime configuration for the server and gateway.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// TCP port to bind (SERVER_PORT, default 3000)
    pub port: u16,
    /// Interval between heartbeat pings on a connection
    /// (HEARTBEAT_INTERVAL_SECS, default 30)
    pub heartbeat_interval: Duration,
    /// A connection silent for longer than this is deregistered
    /// (HEARTBEAT_TIMEOUT_SECS, default 90)
    pub heartbeat_timeout: Duration,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            port: env_parse("SERVER_PORT", 3000),
            heartbeat_interval: Duration::from_secs(env_parse("HEARTBEAT_INTERVAL_SECS", 30)),
            heartbeat_timeout: Duration::from_secs(env_parse("HEARTBEAT_TIMEOUT_SECS", 90)),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            heartbeat_interval: Duration::from_secs(30),
            heartbeat_timeout: Duration::from_secs(90),
        }
    }
}

fn env_parse<T: std::str::FromStr + Copy>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Database configuration result
pub type DatabaseConfig = Option<PgPool>;

/// Load and initialize the database connection pool.
///
/// Reads `DATABASE_URL`, connects, and runs migrations. Returns `None` on
/// any failure so the server can continue on in-memory stores.
pub async fn load_database() -> DatabaseConfig {
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!("DATABASE_URL not set, falling back to in-memory stores");
            return None;
        }
    };

    tracing::info!("Connecting to database...");

    let pool = match PgPool::connect(&database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Failed to create database connection pool: {e:?}");
            tracing::warn!("Falling back to in-memory stores");
            return None;
        }
    };

    tracing::info!("Database connection pool created");

    match sqlx::migrate!().run(&pool).await {
        Ok(_) => tracing::info!("Database migrations completed"),
        Err(e) => {
            // Migrations may already be applied by another instance.
            tracing::warn!("Failed to run database migrations: {e}");
        }
    }

    Some(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert!(config.heartbeat_timeout > config.heartbeat_interval);
    }
}
