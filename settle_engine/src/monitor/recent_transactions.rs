use std::collections::{HashSet, VecDeque};

/// A bounded memory of the transactions that have already been applied to bills.
///
/// Payment events are delivered at least once, so the same transaction can turn up again. Once full, the oldest hash
/// is forgotten to make room for a new one.
#[derive(Debug)]
pub struct RecentTransactions {
    capacity: usize,
    order: VecDeque<String>,
    seen: HashSet<String>,
}

impl RecentTransactions {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, order: VecDeque::with_capacity(capacity), seen: HashSet::with_capacity(capacity) }
    }

    pub fn contains(&self, tx_hash: &str) -> bool {
        self.seen.contains(tx_hash)
    }

    /// Records a hash. Returns true if it was not known before.
    pub fn insert(&mut self, tx_hash: &str) -> bool {
        if self.capacity == 0 || self.seen.contains(tx_hash) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.order.push_back(tx_hash.to_string());
        self.seen.insert(tx_hash.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
