//! Graph Store
//!
//! Persistent storage of the per-user follower/following edge sets. Each
//! half-edge operation is individually atomic and conditional: an insert
//! reports whether it actually inserted, a removal whether it actually
//! removed. The Social Graph Manager composes these halves into its
//! dual-write protocol; nothing else writes these sets.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::CoreResult;

/// Half-edge storage operations over the two redundant edge sets.
///
/// "Half" means one side of a follow edge: the `following` entry on the
/// actor or the `followers` entry on the target. Every mutation returns
/// whether the set changed, which is what makes concurrent duplicate calls
/// collapse into one edge.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Add `target` to `user.following`. Returns false if already present.
    async fn add_following(&self, user: Uuid, target: Uuid) -> CoreResult<bool>;

    /// Remove `target` from `user.following`. Returns false if absent.
    async fn remove_following(&self, user: Uuid, target: Uuid) -> CoreResult<bool>;

    /// Add `follower` to `user.followers`. Returns false if already present.
    async fn add_follower(&self, user: Uuid, follower: Uuid) -> CoreResult<bool>;

    /// Remove `follower` from `user.followers`. Returns false if absent.
    async fn remove_follower(&self, user: Uuid, follower: Uuid) -> CoreResult<bool>;

    /// Snapshot of `user.following`.
    async fn following_of(&self, user: Uuid) -> CoreResult<Vec<Uuid>>;

    /// Snapshot of `user.followers`.
    async fn followers_of(&self, user: Uuid) -> CoreResult<Vec<Uuid>>;

    /// O(1)-ish membership check against `user.following`.
    async fn is_following(&self, user: Uuid, target: Uuid) -> CoreResult<bool>;
}

/// Edge sets stored in the `user_following` / `user_followers` tables.
pub struct PgGraphStore {
    pool: PgPool,
}

impl PgGraphStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GraphStore for PgGraphStore {
    async fn add_following(&self, user: Uuid, target: Uuid) -> CoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO user_following (user_id, target_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(user)
        .bind(target)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove_following(&self, user: Uuid, target: Uuid) -> CoreResult<bool> {
        let result = sqlx::query(
            "DELETE FROM user_following WHERE user_id = $1 AND target_id = $2",
        )
        .bind(user)
        .bind(target)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn add_follower(&self, user: Uuid, follower: Uuid) -> CoreResult<bool> {
        let result = sqlx::query(
            "INSERT INTO user_followers (user_id, follower_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(user)
        .bind(follower)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove_follower(&self, user: Uuid, follower: Uuid) -> CoreResult<bool> {
        let result = sqlx::query(
            "DELETE FROM user_followers WHERE user_id = $1 AND follower_id = $2",
        )
        .bind(user)
        .bind(follower)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn following_of(&self, user: Uuid) -> CoreResult<Vec<Uuid>> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT target_id FROM user_following WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn followers_of(&self, user: Uuid) -> CoreResult<Vec<Uuid>> {
        let rows: Vec<(Uuid,)> = sqlx::query_as(
            "SELECT follower_id FROM user_followers WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn is_following(&self, user: Uuid, target: Uuid) -> CoreResult<bool> {
        let row = sqlx::query(
            "SELECT 1 AS one FROM user_following WHERE user_id = $1 AND target_id = $2",
        )
        .bind(user)
        .bind(target)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }
}

/// Edge sets held in process memory, used when no database is configured
/// and by tests. Each method takes the lock once and never awaits while
/// holding it, so individual half-edge operations are atomic.
#[derive(Default)]
pub struct MemoryGraphStore {
    inner: Mutex<MemoryGraph>,
}

#[derive(Default)]
struct MemoryGraph {
    following: HashMap<Uuid, HashSet<Uuid>>,
    followers: HashMap<Uuid, HashSet<Uuid>>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn add_following(&self, user: Uuid, target: Uuid) -> CoreResult<bool> {
        let mut graph = self.inner.lock().unwrap();
        Ok(graph.following.entry(user).or_default().insert(target))
    }

    async fn remove_following(&self, user: Uuid, target: Uuid) -> CoreResult<bool> {
        let mut graph = self.inner.lock().unwrap();
        let removed = graph
            .following
            .get_mut(&user)
            .map(|set| set.remove(&target))
            .unwrap_or(false);
        if let Some(set) = graph.following.get(&user) {
            if set.is_empty() {
                graph.following.remove(&user);
            }
        }
        Ok(removed)
    }

    async fn add_follower(&self, user: Uuid, follower: Uuid) -> CoreResult<bool> {
        let mut graph = self.inner.lock().unwrap();
        Ok(graph.followers.entry(user).or_default().insert(follower))
    }

    async fn remove_follower(&self, user: Uuid, follower: Uuid) -> CoreResult<bool> {
        let mut graph = self.inner.lock().unwrap();
        let removed = graph
            .followers
            .get_mut(&user)
            .map(|set| set.remove(&follower))
            .unwrap_or(false);
        if let Some(set) = graph.followers.get(&user) {
            if set.is_empty() {
                graph.followers.remove(&user);
            }
        }
        Ok(removed)
    }

    async fn following_of(&self, user: Uuid) -> CoreResult<Vec<Uuid>> {
        let graph = self.inner.lock().unwrap();
        let mut out: Vec<Uuid> = graph
            .following
            .get(&user)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        // Stable iteration within one call.
        out.sort();
        Ok(out)
    }

    async fn followers_of(&self, user: Uuid) -> CoreResult<Vec<Uuid>> {
        let graph = self.inner.lock().unwrap();
        let mut out: Vec<Uuid> = graph
            .followers
            .get(&user)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        out.sort();
        Ok(out)
    }

    async fn is_following(&self, user: Uuid, target: Uuid) -> CoreResult<bool> {
        let graph = self.inner.lock().unwrap();
        Ok(graph
            .following
            .get(&user)
            .map(|set| set.contains(&target))
            .unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_add_following_reports_insertion() {
        let store = MemoryGraphStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert!(store.add_following(a, b).await.unwrap());
        // Second insert is a no-op.
        assert!(!store.add_following(a, b).await.unwrap());
        assert!(store.is_following(a, b).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_absent_edge_is_noop() {
        let store = MemoryGraphStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert!(!store.remove_following(a, b).await.unwrap());
        assert!(!store.remove_follower(b, a).await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_sets_are_dropped() {
        let store = MemoryGraphStore::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        store.add_following(a, b).await.unwrap();
        store.remove_following(a, b).await.unwrap();
        assert!(store.following_of(a).await.unwrap().is_empty());
    }
}
