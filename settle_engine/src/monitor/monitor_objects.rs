use std::time::Duration;

use crate::db_types::Bill;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Time between reconciliation sweeps. The first sweep runs as soon as the monitor starts.
    pub reconcile_interval: Duration,
    /// Upper bound on each chain query made during a sweep.
    pub query_timeout: Duration,
    /// How many applied transaction hashes are remembered for duplicate suppression.
    pub dedupe_capacity: usize,
    /// How many bills a sweep reconciles at once.
    pub sweep_concurrency: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            reconcile_interval: Duration::from_secs(30),
            query_timeout: Duration::from_secs(10),
            dedupe_capacity: 4096,
            sweep_concurrency: 8,
        }
    }
}

/// What happened to a payment event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// The payment was added to the bill. Contains the updated bill.
    Applied(Bill),
    /// The transaction has already been applied, so the event was ignored.
    Duplicate,
    /// The bill is closed and was left alone.
    BillClosed,
}

/// What a reconciliation did to a single bill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The paid amount was overwritten with the chain's total. Contains the updated bill.
    Corrected(Bill),
    /// The bill already agreed with the chain.
    Unchanged,
    /// The bill is no longer open or partially paid.
    Skipped,
}

/// A summary of a single reconciliation sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub checked: usize,
    pub corrected: usize,
    pub unchanged: usize,
    pub failed: usize,
}
