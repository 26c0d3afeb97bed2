use std::sync::Arc;

use log::*;
use tokio::sync::{mpsc, watch, Mutex};

use crate::{
    chain::{ChainError, PaymentEvent, RawPaymentLog, Subscription},
    events::Handler,
};

/// An in-process push feed of raw payment logs.
///
/// Whatever is watching the chain (typically an indexer calling the server's relay webhook) publishes raw logs into
/// the feed. A single subscriber at a time receives them as validated [`PaymentEvent`]s. Logs that fail validation
/// are logged and dropped.
#[derive(Clone)]
pub struct EventFeed {
    sender: mpsc::Sender<RawPaymentLog>,
    receiver: Arc<Mutex<mpsc::Receiver<RawPaymentLog>>>,
}

impl EventFeed {
    pub fn new(buffer_size: usize) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        Self { sender, receiver: Arc::new(Mutex::new(receiver)) }
    }

    /// Queues a raw log for delivery. Never waits: if the feed is full the log is refused with
    /// [`ChainError::FeedFull`], and the relay may try again later.
    pub fn publish(&self, log: RawPaymentLog) -> Result<(), ChainError> {
        self.sender.try_send(log).map_err(|e| match e {
            mpsc::error::TrySendError::Full(log) => {
                warn!("⛓️ Payment event feed is full. Refusing log for tx {}", log.tx_hash);
                ChainError::FeedFull
            },
            mpsc::error::TrySendError::Closed(_) => ChainError::SubscriptionFailed("The event feed is closed".into()),
        })
    }

    /// Starts delivering events to `handler`. Fails if another subscription is already active.
    ///
    /// Logs still queued when the subscription ends stay in the feed for the next subscriber.
    pub fn subscribe(&self, handler: Handler<PaymentEvent>) -> Result<Subscription, ChainError> {
        let mut receiver = Arc::clone(&self.receiver)
            .try_lock_owned()
            .map_err(|_| ChainError::SubscriptionFailed("The event feed already has a subscriber".into()))?;
        let (stop, mut stopped) = watch::channel(false);
        let task = tokio::spawn(async move {
            debug!("⛓️ Payment event delivery has started");
            loop {
                let raw = tokio::select! {
                    biased;
                    _ = stopped.changed() => break,
                    raw = receiver.recv() => match raw {
                        Some(raw) => raw,
                        None => break,
                    },
                };
                let tx_hash = raw.tx_hash.clone();
                match PaymentEvent::try_from(raw) {
                    Ok(event) => {
                        trace!("⛓️ Delivering payment event for bill #{} (tx {tx_hash})", event.bill_id);
                        (handler)(event).await;
                    },
                    Err(e) => warn!("⛓️ Dropping payment log for tx {tx_hash}. {e}"),
                }
            }
            debug!("⛓️ Payment event delivery has ended");
        });
        Ok(Subscription::new("payment event feed", stop, task))
    }
}
