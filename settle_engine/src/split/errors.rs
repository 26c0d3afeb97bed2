use settle_common::Money;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SplitError {
    #[error("Invalid split request: {0}")]
    InvalidArgument(String),
    #[error("Split amounts do not add up to the bill total: {allocated} != {total}")]
    Inconsistent { allocated: Money, total: Money },
    #[error("Item {0} does not exist on this bill")]
    NotFound(i64),
    #[error("Item {item_id} ({item_name}) has not been assigned to anyone")]
    Incomplete { item_id: i64, item_name: String },
}
