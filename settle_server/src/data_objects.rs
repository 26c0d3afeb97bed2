use serde::{Deserialize, Serialize};
use settle_engine::{db_types::BillStatus, RawPaymentLog};

/// The relay may post a single log or a batch of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChainEventBatch {
    Many(Vec<RawPaymentLog>),
    One(RawPaymentLog),
}

impl ChainEventBatch {
    pub fn into_logs(self) -> Vec<RawPaymentLog> {
        match self {
            ChainEventBatch::Many(logs) => logs,
            ChainEventBatch::One(log) => vec![log],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEventsResult {
    /// Logs queued for the payment monitor.
    pub accepted: usize,
    /// Logs that failed validation and were discarded.
    pub rejected: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    pub tx_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationResult {
    pub bill_id: i64,
    pub tx_hash: String,
    pub status: BillStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WsParams {
    /// Comma separated room names, e.g. `business:1,bill:7`.
    pub rooms: Option<String>,
}
