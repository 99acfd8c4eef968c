//! User Directory
//!
//! Read-only seam to the external account service. The core never creates
//! or mutates accounts; it only needs to answer "does this user exist" and
//! to resolve ids into public summaries for follower/following listings.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::CoreResult;
use crate::shared::UserSummary;

/// Read-only access to user accounts.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Whether the account exists.
    async fn exists(&self, user_id: Uuid) -> CoreResult<bool>;

    /// Public summary for one account, if it exists.
    async fn summary(&self, user_id: Uuid) -> CoreResult<Option<UserSummary>>;

    /// Public summaries for a set of accounts. Ids with no account are
    /// silently skipped; order follows the input.
    async fn summaries(&self, user_ids: &[Uuid]) -> CoreResult<Vec<UserSummary>>;
}

/// Directory backed by the `users` table of the shared store.
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn exists(&self, user_id: Uuid) -> CoreResult<bool> {
        let row = sqlx::query("SELECT 1 AS one FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn summary(&self, user_id: Uuid) -> CoreResult<Option<UserSummary>> {
        let row = sqlx::query("SELECT id, username, email FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| UserSummary {
            id: r.get("id"),
            username: r.get("username"),
            email: r.get("email"),
        }))
    }

    async fn summaries(&self, user_ids: &[Uuid]) -> CoreResult<Vec<UserSummary>> {
        let mut out = Vec::with_capacity(user_ids.len());
        for id in user_ids {
            if let Some(summary) = self.summary(*id).await? {
                out.push(summary);
            }
        }
        Ok(out)
    }
}

/// In-memory directory, used when no database is configured and by tests.
#[derive(Default)]
pub struct MemoryUserDirectory {
    users: Mutex<HashMap<Uuid, UserSummary>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account. Returns the generated id.
    pub fn insert(&self, username: &str, email: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.users.lock().unwrap().insert(
            id,
            UserSummary {
                id,
                username: username.to_string(),
                email: email.to_string(),
            },
        );
        id
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn exists(&self, user_id: Uuid) -> CoreResult<bool> {
        Ok(self.users.lock().unwrap().contains_key(&user_id))
    }

    async fn summary(&self, user_id: Uuid) -> CoreResult<Option<UserSummary>> {
        Ok(self.users.lock().unwrap().get(&user_id).cloned())
    }

    async fn summaries(&self, user_ids: &[Uuid]) -> CoreResult<Vec<UserSummary>> {
        let users = self.users.lock().unwrap();
        Ok(user_ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }
}
