use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::Bill;

/// What caused a bill's payment fields to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateSource {
    /// A payment event pushed from the chain subscription.
    PaymentEvent,
    /// The periodic sweep found the local record out of step with the chain.
    Reconciliation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillUpdatedEvent {
    pub old_bill: Bill,
    pub new_bill: Bill,
    pub source: UpdateSource,
    /// The transaction that triggered the update, for event-driven updates.
    pub tx_hash: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl BillUpdatedEvent {
    pub fn new(old_bill: Bill, new_bill: Bill, source: UpdateSource) -> Self {
        Self { old_bill, new_bill, source, tx_hash: None, timestamp: Utc::now() }
    }

    pub fn with_tx_hash<S: Into<String>>(mut self, tx_hash: S) -> Self {
        self.tx_hash = Some(tx_hash.into());
        self
    }

    pub fn status_changed(&self) -> bool {
        self.old_bill.status != self.new_bill.status
    }
}
