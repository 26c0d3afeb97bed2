use std::future::Future;

use thiserror::Error;

use crate::db_types::{Bill, BillItem, BillStatus, Table};

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Bill #{0} does not exist")]
    BillNotFound(i64),
    #[error("Table #{0} does not exist")]
    TableNotFound(i64),
    #[error("Bill #{0} is closed and cannot be modified")]
    BillClosed(i64),
    #[error("Database error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Backend failures are worth retrying. Missing records and closed bills are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Backend(_))
    }
}

/// The query/update contract the payment monitor and splitting code need from the persistence layer.
///
/// The returned futures are `Send` so that implementations can be driven from spawned tasks (the event subscription
/// and the reconciliation ticker both run on the tokio thread pool).
pub trait BillStore: Clone + Send + Sync + 'static {
    /// Fetches the bill record, without its items.
    fn fetch_bill(&self, bill_id: i64) -> impl Future<Output = Result<Bill, StoreError>> + Send;

    /// Overwrites the mutable payment fields of the bill (`paid_amount`, `tip_amount`, `status`, `updated_at`).
    ///
    /// Implementations must refuse to modify a bill that is already closed.
    fn update_bill(&self, bill: &Bill) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fetches the items for the bill, in the order they were added.
    fn fetch_bill_items(&self, bill_id: i64) -> impl Future<Output = Result<Vec<BillItem>, StoreError>> + Send;

    fn fetch_bills_by_status(&self, status: BillStatus) -> impl Future<Output = Result<Vec<Bill>, StoreError>> + Send;

    fn fetch_table(&self, table_id: i64) -> impl Future<Output = Result<Table, StoreError>> + Send;

    /// Fetches the bill together with its items. This is the snapshot the splitting engine works on.
    fn fetch_bill_with_items(&self, bill_id: i64) -> impl Future<Output = Result<Bill, StoreError>> + Send {
        async move {
            let bill = self.fetch_bill(bill_id).await?;
            let items = self.fetch_bill_items(bill_id).await?;
            Ok(bill.with_items(items))
        }
    }
}
