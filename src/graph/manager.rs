/**
 * Social Graph Manager
 *
 * Exposes follow/unfollow/list operations over the Graph Store with
 * atomicity and idempotency guarantees.
 *
 * # Dual-Write Protocol
 *
 * The two edge sets (actor.following and target.followers) may live in a
 * store with no cross-entity transactions, so the manager runs a
 * compensating-action protocol: write side A, then side B; on failure of B,
 * roll back A before returning the error. If the rollback itself fails the
 * graph is genuinely inconsistent - that is logged as a critical internal
 * error and surfaced as `Conflict`, never silently dropped.
 *
 * # Idempotency
 *
 * Follow of an existing edge and unfollow of an absent edge are no-op
 * successes. The store's conditional half-edge writes make concurrent
 * duplicate calls collapse: of N concurrent `follow(A, B)` calls exactly
 * one observes an insertion and performs the B-side write.
 */

use std::sync::Arc;

use uuid::Uuid;

use crate::directory::UserDirectory;
use crate::error::{CoreError, CoreResult};
use crate::graph::store::GraphStore;
use crate::shared::UserSummary;

/// Outcome of a follow/unfollow call, distinguishing a state change from an
/// idempotent no-op. Both are successes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeChange {
    /// The edge was created or removed by this call.
    Applied,
    /// The requested state already held.
    NoOp,
}

pub struct SocialGraphManager {
    store: Arc<dyn GraphStore>,
    directory: Arc<dyn UserDirectory>,
}

impl SocialGraphManager {
    pub fn new(store: Arc<dyn GraphStore>, directory: Arc<dyn UserDirectory>) -> Self {
        Self { store, directory }
    }

    /// Make `actor` follow `target`.
    pub async fn follow(&self, actor: Uuid, target: Uuid) -> CoreResult<EdgeChange> {
        if actor == target {
            return Err(CoreError::invalid("You cannot follow/unfollow yourself"));
        }
        self.require_users(actor, target).await?;

        // Side A: actor.following. A false return means the edge already
        // exists and the invariant says the follower side does too.
        if !self.store.add_following(actor, target).await? {
            return Ok(EdgeChange::NoOp);
        }

        // Side B: target.followers, with compensation on failure.
        if let Err(err) = self.store.add_follower(target, actor).await {
            tracing::warn!(%actor, %target, "follower-side write failed, rolling back: {err}");
            if let Err(rollback_err) = self.store.remove_following(actor, target).await {
                tracing::error!(
                    %actor, %target,
                    "edge rollback failed, graph is inconsistent: {rollback_err}"
                );
                return Err(CoreError::conflict(format!(
                    "partial follow edge {actor}->{target}: {rollback_err}"
                )));
            }
            return Err(err);
        }

        tracing::debug!(%actor, %target, "follow edge created");
        Ok(EdgeChange::Applied)
    }

    /// Make `actor` unfollow `target`. Symmetric to `follow`.
    pub async fn unfollow(&self, actor: Uuid, target: Uuid) -> CoreResult<EdgeChange> {
        if actor == target {
            return Err(CoreError::invalid("You cannot follow/unfollow yourself"));
        }
        self.require_users(actor, target).await?;

        if !self.store.remove_following(actor, target).await? {
            return Ok(EdgeChange::NoOp);
        }

        if let Err(err) = self.store.remove_follower(target, actor).await {
            tracing::warn!(%actor, %target, "follower-side removal failed, rolling back: {err}");
            if let Err(rollback_err) = self.store.add_following(actor, target).await {
                tracing::error!(
                    %actor, %target,
                    "edge rollback failed, graph is inconsistent: {rollback_err}"
                );
                return Err(CoreError::conflict(format!(
                    "partial unfollow edge {actor}->{target}: {rollback_err}"
                )));
            }
            return Err(err);
        }

        tracing::debug!(%actor, %target, "follow edge removed");
        Ok(EdgeChange::Applied)
    }

    /// Current snapshot of the user's followers, resolved to summaries.
    pub async fn list_followers(&self, user: Uuid) -> CoreResult<Vec<UserSummary>> {
        self.require_user(user).await?;
        let ids = self.store.followers_of(user).await?;
        self.directory.summaries(&ids).await
    }

    /// Current snapshot of who the user follows, resolved to summaries.
    pub async fn list_following(&self, user: Uuid) -> CoreResult<Vec<UserSummary>> {
        self.require_user(user).await?;
        let ids = self.store.following_of(user).await?;
        self.directory.summaries(&ids).await
    }

    /// Membership check against `actor.following`.
    pub async fn is_following(&self, actor: Uuid, target: Uuid) -> CoreResult<bool> {
        self.store.is_following(actor, target).await
    }

    async fn require_user(&self, user: Uuid) -> CoreResult<()> {
        if !self.directory.exists(user).await? {
            return Err(CoreError::not_found("User not found"));
        }
        Ok(())
    }

    async fn require_users(&self, a: Uuid, b: Uuid) -> CoreResult<()> {
        self.require_user(a).await?;
        self.require_user(b).await
    }
}
