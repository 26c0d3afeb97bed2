use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("Chain query failed: {0}")]
    QueryFailed(String),
    #[error("Chain query timed out")]
    Timeout,
    #[error("Could not subscribe to payment events: {0}")]
    SubscriptionFailed(String),
    #[error("Malformed payment event: {0}")]
    MalformedEvent(String),
    #[error("The payment event feed is full")]
    FeedFull,
}

impl ChainError {
    /// Whether retrying the same operation later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChainError::QueryFailed(_) | ChainError::Timeout | ChainError::FeedFull)
    }
}
