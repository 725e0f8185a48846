//! Per-owner async locks.
//!
//! Every transition on an owner's order holds that owner's lock for its
//! whole duration, snapshot write included. Transitions on different owners
//! run independently; the engine's table mutex is only held for the short
//! synchronous section inside.

use std::collections::HashMap;
use std::sync::Arc;

use orderdesk_types::UserId;
use parking_lot::Mutex;
use tokio::sync::OwnedMutexGuard;

/// Registry of one `tokio` mutex per owner.
///
/// An entry exists only while some task holds or waits for that owner's
/// lock, so the map stays as small as the set of owners in flight.
#[derive(Debug, Default)]
pub struct OwnerLocks {
    locks: Mutex<HashMap<UserId, Arc<tokio::sync::Mutex<()>>>>,
}

/// Exclusive access to one owner. Dropping it releases the lock and, if no
/// one else is waiting, removes the owner's entry.
#[derive(Debug)]
pub struct OwnerGuard<'a> {
    _guard: OwnedMutexGuard<()>,
    _release: Release<'a>,
}

/// Drops the registry entry once the map holds the only reference.
#[derive(Debug)]
struct Release<'a> {
    registry: &'a OwnerLocks,
    owner: UserId,
}

impl Drop for Release<'_> {
    fn drop(&mut self) {
        let mut locks = self.registry.locks.lock();
        if locks
            .get(&self.owner)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.owner);
        }
    }
}

impl OwnerLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `owner`. Released when the guard drops.
    pub async fn acquire(&self, owner: UserId) -> OwnerGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock();
            Arc::clone(locks.entry(owner).or_default())
        };
        // Declared before the wait so a cancelled acquire still cleans up.
        let release = Release {
            registry: self,
            owner,
        };
        let guard = lock.lock_owned().await;
        OwnerGuard {
            _guard: guard,
            _release: release,
        }
    }

    /// Owners currently locked or waited on.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_owner_is_exclusive() {
        let locks = OwnerLocks::new();
        let guard = locks.acquire(UserId(1)).await;
        let second = tokio::time::timeout(Duration::from_millis(50), locks.acquire(UserId(1))).await;
        assert!(second.is_err(), "second acquire must wait");
        drop(guard);
        let third = tokio::time::timeout(Duration::from_millis(50), locks.acquire(UserId(1))).await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn different_owners_do_not_block() {
        let locks = OwnerLocks::new();
        let _a = locks.acquire(UserId(1)).await;
        let b = tokio::time::timeout(Duration::from_millis(50), locks.acquire(UserId(2))).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn entries_removed_after_release() {
        let locks = OwnerLocks::new();
        for owner in 0..10_000 {
            let _guard = locks.acquire(UserId(owner)).await;
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn entry_kept_while_someone_waits() {
        let locks = std::sync::Arc::new(OwnerLocks::new());
        let guard = locks.acquire(UserId(1)).await;

        let waiter = tokio::spawn({
            let locks = std::sync::Arc::clone(&locks);
            async move {
                let _guard = locks.acquire(UserId(1)).await;
            }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(guard);
        assert_eq!(locks.len(), 1, "waiter still references the entry");

        waiter.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn cancelled_wait_cleans_up() {
        let locks = OwnerLocks::new();
        let guard = locks.acquire(UserId(1)).await;
        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), locks.acquire(UserId(1))).await;
        assert!(timed_out.is_err());
        drop(guard);
        assert!(locks.is_empty());
    }
}
