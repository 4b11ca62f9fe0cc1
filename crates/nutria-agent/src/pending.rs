// SPDX-FileCopyrightText: 2026 Nutria Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory pending actions awaiting a yes/no reply.
//!
//! Each address owns one slot guarded by an async mutex. Callers lock the
//! slot for the whole read-check-then-mutate sequence, so two concurrent
//! image analyses for the same user cannot both open an action. A slot left
//! empty is removed when its guard is released, so only users with an open
//! action keep an entry. Expiry is lazy on access; [`PendingActions::sweep`]
//! drops idle expired entries.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeDelta};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// What a pending action will do once confirmed.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingKind {
    /// Record a meal proposed by an image analysis.
    MealConfirmation {
        food_name: String,
        calories: u32,
        from_image: bool,
    },
}

/// A proposal waiting for the user's confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction {
    pub kind: PendingKind,
    pub created_at: DateTime<Local>,
}

impl PendingAction {
    pub fn meal(food_name: impl Into<String>, calories: u32, created_at: DateTime<Local>) -> Self {
        Self {
            kind: PendingKind::MealConfirmation {
                food_name: food_name.into(),
                calories,
                from_image: true,
            },
            created_at,
        }
    }

    /// Expired once `now - created_at >= ttl`.
    pub fn is_expired(&self, now: DateTime<Local>, ttl: TimeDelta) -> bool {
        now.signed_duration_since(self.created_at) >= ttl
    }
}

type Slot = Arc<Mutex<Option<PendingAction>>>;
type Slots = Arc<DashMap<String, Slot>>;

/// Owned store of at most one pending action per address.
pub struct PendingActions {
    slots: Slots,
    ttl: TimeDelta,
}

impl PendingActions {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
        }
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    /// Locks the slot for `address`. Hold the guard across the whole
    /// check-and-mutate sequence.
    pub async fn lock(&self, address: &str) -> PendingGuard {
        // Clone the Arc out so the map shard is not held across the await.
        let slot = self.slots.entry(address.to_string()).or_default().clone();
        PendingGuard {
            guard: slot.lock_owned().await,
            ttl: self.ttl,
            address: address.to_string(),
            slots: self.slots.clone(),
        }
    }

    /// Opens an action for `address`, replacing any previous one.
    pub async fn open(&self, address: &str, action: PendingAction) {
        let mut guard = self.lock(address).await;
        if guard.replace(action).is_some() {
            debug!(address, "replaced existing pending action");
        }
    }

    /// Returns a copy of the live action for `address`, expiring it lazily.
    pub async fn peek(&self, address: &str, now: DateTime<Local>) -> Option<PendingAction> {
        self.lock(address).await.live(now).cloned()
    }

    /// Drops empty and expired slots that no task currently holds.
    /// Returns the number of entries removed.
    pub fn sweep(&self, now: DateTime<Local>) -> usize {
        let before = self.slots.len();
        let ttl = self.ttl;
        self.slots.retain(|_, slot| {
            // Another task has cloned this slot and may be about to lock it.
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            match slot.try_lock() {
                Ok(action) => action.as_ref().is_some_and(|a| !a.is_expired(now, ttl)),
                Err(_) => true,
            }
        });
        before.saturating_sub(self.slots.len())
    }

    /// Number of tracked slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Exclusive access to one user's pending slot.
///
/// Dropping the guard with the slot empty removes the entry, unless another
/// task is already waiting on the same slot.
pub struct PendingGuard {
    guard: OwnedMutexGuard<Option<PendingAction>>,
    ttl: TimeDelta,
    address: String,
    slots: Slots,
}

impl PendingGuard {
    /// The live action, if any. An expired action is removed.
    pub fn live(&mut self, now: DateTime<Local>) -> Option<&PendingAction> {
        if self
            .guard
            .as_ref()
            .is_some_and(|a| a.is_expired(now, self.ttl))
        {
            debug!("pending action expired");
            *self.guard = None;
        }
        self.guard.as_ref()
    }

    /// Stores `action`, returning the one it replaced.
    pub fn replace(&mut self, action: PendingAction) -> Option<PendingAction> {
        self.guard.replace(action)
    }

    pub fn clear(&mut self) -> Option<PendingAction> {
        self.guard.take()
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.guard.is_some() {
            return;
        }
        // One reference in the map, one held by this guard.
        let held = OwnedMutexGuard::mutex(&self.guard);
        self.slots.remove_if(&self.address, |_, slot| {
            Arc::ptr_eq(slot, held) && Arc::strong_count(slot) <= 2
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2026, 3, 10, h, m, s)
            .single()
            .unwrap()
    }

    fn store() -> PendingActions {
        PendingActions::new(Duration::from_secs(300))
    }

    #[tokio::test]
    async fn open_replaces_previous_action() {
        let pending = store();
        pending
            .open("5511", PendingAction::meal("Arroz", 300, at(12, 0, 0)))
            .await;
        pending
            .open("5511", PendingAction::meal("Feijão", 200, at(12, 1, 0)))
            .await;

        let live = pending.peek("5511", at(12, 2, 0)).await.unwrap();
        assert_eq!(
            live.kind,
            PendingKind::MealConfirmation {
                food_name: "Feijão".into(),
                calories: 200,
                from_image: true
            }
        );
        assert_eq!(pending.len(), 1);
    }

    #[tokio::test]
    async fn action_expires_exactly_at_ttl() {
        let pending = store();
        pending
            .open("5511", PendingAction::meal("Arroz", 300, at(12, 0, 0)))
            .await;

        assert!(pending.peek("5511", at(12, 4, 59)).await.is_some());
        assert!(pending.peek("5511", at(12, 5, 0)).await.is_none());
        // Removed, not just hidden.
        assert!(pending.peek("5511", at(12, 0, 1)).await.is_none());
    }

    #[tokio::test]
    async fn users_are_independent() {
        let pending = store();
        pending
            .open("a", PendingAction::meal("Arroz", 300, at(12, 0, 0)))
            .await;
        assert!(pending.peek("b", at(12, 0, 1)).await.is_none());
        assert!(pending.peek("a", at(12, 0, 1)).await.is_some());
    }

    #[tokio::test]
    async fn guard_clear_consumes_action() {
        let pending = store();
        pending
            .open("a", PendingAction::meal("Arroz", 300, at(12, 0, 0)))
            .await;
        {
            let mut guard = pending.lock("a").await;
            assert!(guard.live(at(12, 1, 0)).is_some());
            assert!(guard.clear().is_some());
        }
        assert!(pending.peek("a", at(12, 1, 0)).await.is_none());
    }

    #[tokio::test]
    async fn checking_without_an_action_leaves_no_entry() {
        let pending = store();
        for i in 0..100 {
            assert!(pending.peek(&format!("55{i}"), at(12, 0, 0)).await.is_none());
        }
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn cleared_and_expired_slots_are_released() {
        let pending = store();
        pending
            .open("a", PendingAction::meal("Arroz", 300, at(12, 0, 0)))
            .await;
        pending
            .open("b", PendingAction::meal("Pão", 150, at(12, 0, 0)))
            .await;
        assert_eq!(pending.len(), 2);

        pending.lock("a").await.clear();
        assert!(pending.peek("b", at(12, 5, 0)).await.is_none());
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn waiting_task_keeps_the_slot() {
        let pending = Arc::new(store());
        let first = pending.lock("a").await;

        let waiter = {
            let pending = pending.clone();
            tokio::spawn(async move {
                let mut guard = pending.lock("a").await;
                guard.replace(PendingAction::meal("Arroz", 300, at(12, 0, 0)));
            })
        };
        while Arc::strong_count(&pending.slots.get("a").unwrap()) < 3 {
            tokio::task::yield_now().await;
        }
        drop(first);
        waiter.await.unwrap();

        assert_eq!(pending.len(), 1);
        assert!(pending.peek("a", at(12, 1, 0)).await.is_some());
    }

    #[tokio::test]
    async fn sweep_drops_expired_slots() {
        let pending = store();
        pending
            .open("old", PendingAction::meal("Arroz", 300, at(12, 0, 0)))
            .await;
        pending
            .open("fresh", PendingAction::meal("Pão", 150, at(12, 4, 0)))
            .await;
        assert_eq!(pending.len(), 2);

        let removed = pending.sweep(at(12, 6, 0));
        assert_eq!(removed, 1);
        assert!(pending.peek("fresh", at(12, 6, 0)).await.is_some());
    }

    #[tokio::test]
    async fn sweep_skips_locked_slots() {
        let pending = store();
        pending
            .open("busy", PendingAction::meal("Arroz", 300, at(12, 0, 0)))
            .await;
        let _guard = pending.lock("busy").await;
        assert_eq!(pending.sweep(at(13, 0, 0)), 0);
    }

    #[tokio::test]
    async fn concurrent_opens_leave_one_action() {
        let pending = Arc::new(store());
        let mut handles = Vec::new();
        for i in 0..16u32 {
            let pending = pending.clone();
            handles.push(tokio::spawn(async move {
                pending
                    .open("5511", PendingAction::meal(format!("item {i}"), i, at(12, 0, 0)))
                    .await;
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(pending.len(), 1);
        assert!(pending.peek("5511", at(12, 1, 0)).await.is_some());
    }
}
