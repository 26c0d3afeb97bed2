use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<i64, Arc<Mutex<()>>>;

/// Per-bill mutual exclusion.
///
/// Every read-modify-write of a bill's payment fields happens while holding that bill's lock, so an event-driven add
/// and a reconciliation set on the same bill can never interleave. Locks are created on demand and removed again once
/// nobody holds or waits on them.
#[derive(Default)]
pub struct BillLocks {
    locks: Arc<LockMap>,
}

pub struct BillGuard {
    bill_id: i64,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockMap>,
}

impl BillLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, bill_id: i64) -> BillGuard {
        // the shard guard must be gone before we wait on the bill
        let lock = Arc::clone(self.locks.entry(bill_id).or_default().value());
        let guard = lock.lock_owned().await;
        BillGuard { bill_id, guard: Some(guard), locks: Arc::clone(&self.locks) }
    }

    /// The number of bills that currently have a lock entry.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl BillGuard {
    pub fn bill_id(&self) -> i64 {
        self.bill_id
    }
}

impl Drop for BillGuard {
    fn drop(&mut self) {
        // Release the bill first, so that the map entry is the only reference left if nobody else wants it
        drop(self.guard.take());
        self.locks.remove_if(&self.bill_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_bill_is_exclusive() {
        let locks = Arc::new(BillLocks::new());
        let guard = locks.lock(7).await;
        let l2 = Arc::clone(&locks);
        let waiter = tokio::spawn(async move {
            let _g = l2.lock(7).await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        // a different bill is not blocked
        let other = tokio::time::timeout(Duration::from_millis(50), locks.lock(8)).await;
        assert!(other.is_ok());
        drop(other);
        drop(guard);
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn entries_are_cleaned_up() {
        let locks = BillLocks::new();
        for id in 0..10 {
            let g = locks.lock(id).await;
            assert_eq!(g.bill_id(), id);
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn waiters_keep_the_entry_alive() {
        let locks = Arc::new(BillLocks::new());
        let guard = locks.lock(3).await;
        let waiters = (0..4)
            .map(|_| {
                let locks = Arc::clone(&locks);
                tokio::spawn(async move {
                    let _g = locks.lock(3).await;
                    tokio::time::sleep(Duration::from_millis(5)).await;
                })
            })
            .collect::<Vec<_>>();
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(guard);
        assert_eq!(locks.len(), 1);
        for w in waiters {
            w.await.unwrap();
        }
        assert!(locks.is_empty());
    }
}
