//! Keeps the off-chain bill ledger in step with the payment contract.
//!
//! Two paths update a bill's payment fields:
//! * Payment events from the chain subscription **add** the payment amount and tip to the bill.
//! * A periodic reconciliation sweep asks the chain for the total paid on every open or partially paid bill, and
//!   **sets** the bill's paid amount if the two disagree. The sweep is the safety net for lost or malformed events.
//!
//! Both paths take the bill's lock for the whole read-modify-write, and both publish the result through the
//! connection hub. Closed bills are never touched.
mod bill_locks;
mod errors;
mod monitor_objects;
mod payment_monitor;
mod recent_transactions;

pub use bill_locks::{BillGuard, BillLocks};
pub use errors::MonitorError;
pub use monitor_objects::{EventOutcome, MonitorConfig, ReconcileOutcome, SweepReport};
pub use payment_monitor::PaymentMonitor;
pub use recent_transactions::RecentTransactions;
