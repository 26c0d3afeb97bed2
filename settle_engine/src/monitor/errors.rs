use thiserror::Error;

use crate::{chain::ChainError, db::StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    #[error("Bill #{0} does not exist")]
    BillNotFound(i64),
    #[error("Bill #{0} is closed")]
    BillClosed(i64),
    #[error("Temporary failure, this can be retried: {0}")]
    Transient(String),
    #[error("The payment monitor cannot run: {0}")]
    Fatal(String),
    #[error("The payment monitor is already running")]
    AlreadyStarted,
}

impl MonitorError {
    pub fn is_transient(&self) -> bool {
        matches!(self, MonitorError::Transient(_))
    }
}

impl From<StoreError> for MonitorError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::BillNotFound(id) => Self::BillNotFound(id),
            StoreError::BillClosed(id) => Self::BillClosed(id),
            e => Self::Transient(e.to_string()),
        }
    }
}

impl From<ChainError> for MonitorError {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::SubscriptionFailed(s) => Self::Fatal(s),
            e => Self::Transient(e.to_string()),
        }
    }
}
